//! Core types and utilities for the NUT (Network UPS Tools) protocol
//!
//! This crate provides the error taxonomy, the mapping from `ERR` reply codes
//! to typed errors, and the value objects assembled from daemon replies.

pub mod device;
pub mod error;
pub mod mapper;

pub use device::{Client, Device, InstantCommand, ValueFormat, Variable, VariableType};
pub use error::{ErrorKind, NutError, NutResult};
pub use mapper::{ErrorReply, classify, map_error_reply};
