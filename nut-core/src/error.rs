use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Main error type for NUT client operations
///
/// Every variant renders with a `NUT` prefix so callers can tell this
/// library's failures apart from unrelated errors in logs.
#[derive(Error, Debug)]
pub enum NutError {
    #[error("NUT connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("NUT timeout after {0:?}")]
    Timeout(Duration),

    #[error("NUT login error: {0}")]
    Login(String),

    #[error("NUT permission error: {0}")]
    Permission(String),

    #[error("NUT not found: {0}")]
    NotFound(String),

    #[error("NUT protocol error: {0}")]
    Protocol(String),
}

/// Closed set of error kinds exposed by [`NutError::kind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Timeout,
    Login,
    Permission,
    NotFound,
    Protocol,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Login => "login",
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Protocol => "protocol",
        };
        f.write_str(name)
    }
}

impl NutError {
    /// Build an error of the given kind carrying `message`
    ///
    /// Used by the error mapper; `Connection` and `Timeout` are never produced
    /// from reply text, so they fall back to `Protocol` here.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Login => NutError::Login(message),
            ErrorKind::Permission => NutError::Permission(message),
            ErrorKind::NotFound => NutError::NotFound(message),
            ErrorKind::Connection | ErrorKind::Timeout | ErrorKind::Protocol => {
                NutError::Protocol(message)
            }
        }
    }

    /// Error returned by every operation once the client has been shut down
    pub fn closed() -> Self {
        NutError::Connection(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            "connection closed",
        ))
    }

    /// Re-label a rejection received during the login exchange
    ///
    /// upsd answers a bad password with codes such as `ACCESS-DENIED`; during
    /// login every reply-level rejection is a login failure.
    pub fn into_login(self) -> Self {
        match self {
            NutError::Permission(message)
            | NutError::NotFound(message)
            | NutError::Protocol(message) => NutError::Login(message),
            other => other,
        }
    }

    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            NutError::Connection(_) => ErrorKind::Connection,
            NutError::Timeout(_) => ErrorKind::Timeout,
            NutError::Login(_) => ErrorKind::Login,
            NutError::Permission(_) => ErrorKind::Permission,
            NutError::NotFound(_) => ErrorKind::NotFound,
            NutError::Protocol(_) => ErrorKind::Protocol,
        }
    }

    /// Check whether this error comes from the transport rather than the peer
    ///
    /// Transport failures leave the connection unusable and are the only
    /// failures the retry supervisor replays.
    pub fn is_transport(&self) -> bool {
        matches!(self, NutError::Connection(_) | NutError::Timeout(_))
    }
}

/// Result type alias for NUT operations
pub type NutResult<T> = Result<T, NutError>;
