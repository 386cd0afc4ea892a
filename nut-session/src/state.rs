//! Connection state machine

use crate::error::{NutError, NutResult};

/// Connection state
///
/// Tracks the lifecycle of the connection to upsd so that commands are only
/// written on an established stream.
///
/// # State Transitions
/// ```text
/// Disconnected -> Connecting     (connect)
/// Connecting -> Connected        (TCP handshake done)
/// Connecting -> Disconnected     (connect failed)
/// Connected -> Authenticated     (USERNAME/PASSWORD accepted)
/// Connected/Authenticated -> Disconnected (transport failure, logout)
/// any -> Closed                  (shutdown, terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket (initial state)
    Disconnected,
    /// TCP connect in progress
    Connecting,
    /// Socket open, no credentials sent
    Connected,
    /// Socket open and logged in
    Authenticated,
    /// Shut down; never reconnects
    Closed,
}

impl ConnectionState {
    /// Check if commands may be written
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected | ConnectionState::Authenticated
        )
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }

    /// Validate state transition
    ///
    /// # Returns
    /// `Ok(())` if transition is valid, `Err` otherwise
    pub fn validate_transition(&self, new_state: ConnectionState) -> NutResult<()> {
        use ConnectionState::*;

        let valid = match (*self, new_state) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Disconnected, Connecting) => true,
            (Connecting, Connected) => true,
            (Connecting, Disconnected) => true,
            (Connected, Authenticated) => true,
            (Connected | Authenticated, Disconnected) => true,
            (Disconnected, Disconnected) => true,
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(NutError::Protocol(format!(
                "Invalid connection state transition: {:?} -> {:?}",
                self, new_state
            )))
        }
    }
}
