//! Mapping of `ERR` reply codes to typed errors
//!
//! upsd reports failures as `ERR <CODE> [text]`. The daemon knows a couple of
//! dozen codes; callers only need to tell a handful of situations apart, so
//! the codes are folded onto [`ErrorKind`] through one lookup table. New codes
//! are added to [`ERROR_TABLE`] without touching any call site.

use crate::error::{ErrorKind, NutError};
use std::fmt;

/// Reserved first field of an error reply
pub const ERROR_TOKEN: &str = "ERR";

/// Reply code to error kind table
///
/// Codes not listed here map to [`ErrorKind::Protocol`].
pub const ERROR_TABLE: &[(&str, ErrorKind)] = &[
    ("INVALID-USERNAME", ErrorKind::Login),
    ("INVALID-PASSWORD", ErrorKind::Login),
    ("USERNAME-REQUIRED", ErrorKind::Login),
    ("PASSWORD-REQUIRED", ErrorKind::Login),
    ("ALREADY-SET-USERNAME", ErrorKind::Login),
    ("ALREADY-SET-PASSWORD", ErrorKind::Login),
    ("ALREADY-LOGGED-IN", ErrorKind::Login),
    ("ACCESS-DENIED", ErrorKind::Permission),
    ("READONLY", ErrorKind::Permission),
    ("SET-FAILED", ErrorKind::Permission),
    ("INSTCMD-FAILED", ErrorKind::Permission),
    ("UNKNOWN-UPS", ErrorKind::NotFound),
    ("VAR-NOT-SUPPORTED", ErrorKind::NotFound),
    ("CMD-NOT-SUPPORTED", ErrorKind::NotFound),
];

/// A decoded `ERR` reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReply {
    /// Machine-readable code, e.g. `UNKNOWN-UPS`; empty if the daemon sent a bare `ERR`
    pub code: String,
    /// Optional human-readable text following the code
    pub text: Option<String>,
}

impl ErrorReply {
    /// Recognise an error reply from the fields of a decoded line
    ///
    /// # Returns
    /// `None` if the line does not start with [`ERROR_TOKEN`]
    pub fn from_fields(fields: &[String]) -> Option<Self> {
        let (first, rest) = fields.split_first()?;
        if first != ERROR_TOKEN {
            return None;
        }
        let code = rest.first().cloned().unwrap_or_default();
        let text = if rest.len() > 1 {
            Some(rest[1..].join(" "))
        } else {
            None
        };
        Some(Self { code, text })
    }

    /// Error kind of this reply, see [`classify`]
    pub fn kind(&self) -> ErrorKind {
        classify(&self.code)
    }
}

impl fmt::Display for ErrorReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = if self.code.is_empty() { "ERR" } else { &self.code };
        match &self.text {
            Some(text) => write!(f, "{} ({})", code, text),
            None => f.write_str(code),
        }
    }
}

/// Look up the error kind for a reply code
pub fn classify(code: &str) -> ErrorKind {
    ERROR_TABLE
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Protocol)
}

/// Turn an error reply into a typed error
///
/// # Arguments
/// * `reply` - The decoded reply
/// * `request` - The request line that provoked it, appended for diagnostics
pub fn map_error_reply(reply: &ErrorReply, request: &str) -> NutError {
    NutError::from_kind(reply.kind(), format!("{} in reply to `{}`", reply, request))
}
