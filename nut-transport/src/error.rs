//! Error types used by the transport layer

pub use nut_core::error::{NutError, NutResult};
