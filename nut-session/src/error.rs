//! Error types used by the session layer

pub use nut_core::error::{NutError, NutResult};
