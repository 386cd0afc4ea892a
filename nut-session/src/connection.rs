//! Connection manager
//!
//! Owns the command channel and the connection state, and performs the
//! connect / authenticate / reconnect / shutdown sequences. Everything that
//! touches the socket goes through here; callers serialize access by holding
//! the manager behind one lock.

use crate::channel::CommandChannel;
use crate::command::Command;
use crate::error::{NutError, NutResult};
use crate::response::Response;
use crate::state::ConnectionState;
use nut_transport::TransportLayer;
use std::fmt;

/// Username and password replayed on every (re)connect
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Connection lifecycle manager
#[derive(Debug)]
pub struct ConnectionManager<T: TransportLayer> {
    channel: CommandChannel<T>,
    state: ConnectionState,
}

impl<T: TransportLayer> ConnectionManager<T> {
    /// Create a manager in `Disconnected` state
    pub fn new(channel: CommandChannel<T>) -> Self {
        Self {
            channel,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn channel(&self) -> &CommandChannel<T> {
        &self.channel
    }

    /// Whether a command can be written right now without reconnecting
    pub fn is_ready(&self) -> bool {
        self.state.is_ready() && self.channel.is_healthy()
    }

    fn transition(&mut self, new_state: ConnectionState) -> NutResult<()> {
        self.state.validate_transition(new_state)?;
        log::debug!(
            "{}: {:?} -> {:?}",
            self.channel.transport().peer(),
            self.state,
            new_state
        );
        self.state = new_state;
        Ok(())
    }

    /// Open the socket
    ///
    /// A no-op on a healthy open connection. A connection whose last command
    /// never completed is torn down and opened again.
    ///
    /// # Errors
    /// - `NutError::Connection` if the manager is closed, or the host is
    ///   unreachable or refuses within the connect timeout
    pub async fn connect(&mut self) -> NutResult<()> {
        if self.state.is_closed() {
            return Err(NutError::closed());
        }
        if self.is_ready() {
            return Ok(());
        }
        if self.state != ConnectionState::Disconnected {
            self.disconnect().await;
        }

        self.transition(ConnectionState::Connecting)?;
        match self.channel.open().await {
            Ok(()) => self.transition(ConnectionState::Connected),
            Err(e) => {
                let _ = self.channel.close().await;
                self.transition(ConnectionState::Disconnected)?;
                Err(e)
            }
        }
    }

    /// Send `USERNAME` and `PASSWORD`
    ///
    /// # Errors
    /// - `NutError::Login` if upsd rejects either line
    /// - transport errors unchanged
    pub async fn authenticate(&mut self, credentials: &Credentials) -> NutResult<()> {
        if self.state != ConnectionState::Connected {
            return Err(NutError::Protocol(format!(
                "cannot log in while {:?}",
                self.state
            )));
        }

        for command in [
            Command::username(&credentials.username),
            Command::password(&credentials.password),
        ] {
            let reply = self.execute(&command).await.and_then(Response::expect_ok);
            if let Err(e) = reply {
                return Err(if e.is_transport() { e } else { e.into_login() });
            }
        }

        self.transition(ConnectionState::Authenticated)
    }

    /// Replace the socket and log in again
    ///
    /// A socket whose login replay failed is dropped, so it is never used
    /// unauthenticated.
    ///
    /// # Arguments
    /// * `credentials` - Credentials to replay, if the session has logged in
    pub async fn reconnect(&mut self, credentials: Option<&Credentials>) -> NutResult<()> {
        if self.state.is_closed() {
            return Err(NutError::closed());
        }
        self.disconnect().await;
        self.connect().await?;
        if let Some(credentials) = credentials {
            if let Err(e) = self.authenticate(credentials).await {
                self.disconnect().await;
                return Err(e);
            }
        }
        log::debug!("{}: reconnected", self.channel.transport().peer());
        Ok(())
    }

    /// Run one command on the current socket
    ///
    /// Does not connect. A transport failure, or a failure that leaves part of
    /// a reply unread, drops the socket and moves the state to `Disconnected`.
    pub async fn execute(&mut self, command: &Command) -> NutResult<Response> {
        if self.state.is_closed() {
            return Err(NutError::closed());
        }
        if !self.is_ready() {
            return Err(NutError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "not connected",
            )));
        }

        let result = self.channel.round_trip(command).await;
        if result.is_err() && !self.channel.is_healthy() {
            self.disconnect().await;
        }
        result
    }

    /// Close the socket and return to `Disconnected`
    ///
    /// Does nothing once closed.
    pub async fn disconnect(&mut self) {
        if self.state.is_closed() {
            return;
        }
        if let Err(e) = self.channel.close().await {
            log::debug!("{}: close failed: {}", self.channel.transport().peer(), e);
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Log out if authenticated, close the socket and enter `Closed`
    ///
    /// Idempotent: a second call returns immediately.
    pub async fn shutdown(&mut self) {
        if self.state.is_closed() {
            return;
        }
        if self.state == ConnectionState::Authenticated && self.channel.is_healthy() {
            if let Err(e) = self.channel.round_trip(&Command::logout()).await {
                log::debug!("{}: logout during shutdown failed: {}", self.channel.transport().peer(), e);
            }
        }
        if let Err(e) = self.channel.close().await {
            log::debug!("{}: close failed: {}", self.channel.transport().peer(), e);
        }
        self.state = ConnectionState::Closed;
        log::debug!("{}: shut down", self.channel.transport().peer());
    }
}
