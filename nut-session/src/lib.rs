//! Session layer module for the NUT protocol
//!
//! This crate turns a byte-stream transport into a request/response session:
//!
//! - [`command`]: immutable request lines and the well-known upsd verbs
//! - [`codec`]: quoting-aware line encoding and decoding
//! - [`list`]: `BEGIN LIST` / `END LIST` framing
//! - [`channel`]: one-command-in-flight round trips with a per-call timeout
//! - [`state`] and [`connection`]: connection lifecycle and login replay
//!
//! # TODO
//!
//! - [ ] STARTTLS 支持

pub mod channel;
pub mod codec;
pub mod command;
pub mod connection;
pub mod error;
pub mod list;
pub mod response;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{CommandChannel, DEFAULT_MAX_LINE_LENGTH};
pub use codec::{decode_line, encode};
pub use command::{Command, Expect};
pub use connection::{ConnectionManager, Credentials};
pub use error::{NutError, NutResult};
pub use list::{ListDecoder, decode_list};
pub use response::{ListReply, Response};
pub use state::ConnectionState;
