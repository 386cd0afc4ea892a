//! Logged-in session: a connection manager plus the credentials to replay

use crate::retry::{Replay, Request};
use async_trait::async_trait;
use nut_core::NutResult;
use nut_session::{Command, ConnectionManager, ConnectionState, Credentials, Response};
use nut_transport::TransportLayer;

/// Connection manager with remembered credentials
///
/// Credentials are stored only after upsd accepted them. Every reconnect
/// replays them before the interrupted command is sent again.
#[derive(Debug)]
pub struct Session<T: TransportLayer> {
    manager: ConnectionManager<T>,
    credentials: Option<Credentials>,
    /// A rejected USERNAME/PASSWORD exchange is still bound to the socket
    login_rejected: bool,
}

impl<T: TransportLayer> Session<T> {
    /// Create a session
    ///
    /// # Arguments
    /// * `manager` - Connection manager, not yet connected
    /// * `credentials` - Credentials to log in with on first connect
    pub fn new(manager: ConnectionManager<T>, credentials: Option<Credentials>) -> Self {
        Self {
            manager,
            credentials,
            login_rejected: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn manager(&self) -> &ConnectionManager<T> {
        &self.manager
    }

    /// Connect, and log in if credentials are stored
    ///
    /// Nothing is sent when the connection is already usable.
    ///
    /// # Errors
    /// - transport errors from connecting
    /// - `NutError::Login` if the stored credentials are rejected; the socket
    ///   is dropped so the next call starts over
    pub async fn connect(&mut self) -> NutResult<()> {
        if self.manager.is_ready() {
            return Ok(());
        }

        self.login_rejected = false;
        self.manager.connect().await?;
        if let Some(credentials) = &self.credentials {
            if let Err(e) = self.manager.authenticate(credentials).await {
                self.manager.disconnect().await;
                return Err(e);
            }
        }
        Ok(())
    }

    async fn login(&mut self, credentials: &Credentials) -> NutResult<Response> {
        // upsd accepts USERNAME/PASSWORD once per connection
        if self.manager.state() == ConnectionState::Authenticated || self.login_rejected {
            self.manager.disconnect().await;
            self.login_rejected = false;
        }
        self.manager.connect().await?;

        match self.manager.authenticate(credentials).await {
            Ok(()) => {
                self.credentials = Some(credentials.clone());
                log::info!(
                    "{}: logged in as {}",
                    self.manager.channel().transport().peer(),
                    credentials.username
                );
                Ok(Response::Line {
                    fields: vec!["OK".to_string()],
                    raw: "OK\n".to_string(),
                })
            }
            Err(e) => {
                if !e.is_transport() {
                    self.login_rejected = true;
                }
                Err(e)
            }
        }
    }

    /// Send `LOGOUT`, forget the credentials and drop the socket
    ///
    /// Best effort: a failure to deliver `LOGOUT` is only logged.
    pub async fn logout(&mut self) {
        if self.manager.state() == ConnectionState::Authenticated && self.manager.is_ready() {
            if let Err(e) = self.manager.execute(&Command::logout()).await {
                log::debug!("logout failed: {}", e);
            }
        }
        self.credentials = None;
        self.login_rejected = false;
        self.manager.disconnect().await;
    }

    /// Drop the socket without logging out
    pub async fn disconnect(&mut self) {
        self.login_rejected = false;
        self.manager.disconnect().await;
    }

    /// Log out and close for good
    pub async fn shutdown(&mut self) {
        self.manager.shutdown().await;
    }
}

#[async_trait]
impl<T: TransportLayer> Replay for Session<T> {
    async fn attempt(&mut self, request: &Request) -> NutResult<Response> {
        match request {
            Request::Command(command) => {
                self.connect().await?;
                self.manager.execute(command).await
            }
            Request::Login(credentials) => self.login(credentials).await,
        }
    }

    async fn reconnect(&mut self) -> NutResult<()> {
        self.login_rejected = false;
        self.manager.reconnect(self.credentials.as_ref()).await
    }
}
