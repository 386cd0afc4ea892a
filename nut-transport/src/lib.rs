//! Transport layer module for the NUT protocol
//!
//! This crate provides the byte-stream abstraction the session layer talks to
//! and its TCP implementation.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{NutError, NutResult};
pub use stream::{StreamAccessor, TransportLayer};
pub use tcp::{DEFAULT_PORT, TcpSettings, TcpTransport};
