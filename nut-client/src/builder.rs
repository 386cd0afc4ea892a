//! Client builder
//!
//! Collects connection parameters and validates them before a client is
//! created.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use nut_client::ClientBuilder;
//! use std::time::Duration;
//!
//! # fn run() -> nut_core::NutResult<()> {
//! let client = ClientBuilder::new()
//!     .host("ups-server.local")
//!     .port(3493)
//!     .credentials("admin", "secret")
//!     .command_timeout(Duration::from_secs(2))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::client::NutClient;
use nut_core::{NutError, NutResult};
use nut_session::{Credentials, DEFAULT_MAX_LINE_LENGTH};
use nut_transport::{DEFAULT_PORT, TcpSettings, TcpTransport};
use std::time::Duration;

/// Validated client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host name or address of upsd
    pub host: String,
    /// TCP port of upsd
    pub port: u16,
    /// Credentials sent on every connect
    pub credentials: Option<Credentials>,
    /// Bound on establishing the TCP connection
    pub connect_timeout: Duration,
    /// Bound on one command round trip, reply included
    pub command_timeout: Duration,
    /// Bound on each socket read or write, if any
    pub io_timeout: Option<Duration>,
    /// Reconnect-and-replay attempts after a transport failure
    pub max_retries: u32,
    /// Keep the connection open between operations
    pub persistent: bool,
    /// Longest reply line accepted
    pub max_line_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            credentials: None,
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
            io_timeout: None,
            max_retries: 1,
            persistent: true,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ClientConfig {
    /// TCP settings for this configuration
    pub fn tcp_settings(&self) -> TcpSettings {
        TcpSettings {
            timeout: self.io_timeout,
            ..TcpSettings::with_connect_timeout(self.host.clone(), self.port, self.connect_timeout)
        }
    }

    /// Check the configuration
    ///
    /// # Errors
    /// `NutError::Connection` with `InvalidInput` for an empty host, a zero
    /// timeout or a zero line length
    pub fn validate(&self) -> NutResult<()> {
        let problem = if self.host.trim().is_empty() {
            Some("host must not be empty")
        } else if self.connect_timeout.is_zero() {
            Some("connect timeout must be positive")
        } else if self.command_timeout.is_zero() {
            Some("command timeout must be positive")
        } else if self.io_timeout.is_some_and(|t| t.is_zero()) {
            Some("I/O timeout must be positive")
        } else if self.max_line_length == 0 {
            Some("max line length must be positive")
        } else if self
            .credentials
            .as_ref()
            .is_some_and(|c| c.username.is_empty())
        {
            Some("username must not be empty")
        } else {
            None
        };

        match problem {
            Some(message) => Err(NutError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                message,
            ))),
            None => Ok(()),
        }
    }
}

/// Builder for [`NutClient`]
///
/// # Default Settings
/// - Host: `127.0.0.1`, port 3493
/// - Connect and command timeouts: 5 seconds
/// - One reconnect-and-replay after a transport failure
/// - Persistent connection, no credentials
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Log in with these credentials on every connect
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some(Credentials::new(username, password));
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Bound on one command round trip
    ///
    /// A command that does not complete in time fails with
    /// `NutError::Timeout` and the connection is replaced.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// Bound on each socket read or write
    ///
    /// Unset by default; the command timeout still bounds the whole exchange.
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.config.io_timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Keep one connection open across operations (default) or connect per operation
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.config.persistent = persistent;
        self
    }

    pub fn max_line_length(mut self, max_line_length: usize) -> Self {
        self.config.max_line_length = max_line_length;
        self
    }

    /// Validate and return the configuration
    pub fn build_config(self) -> NutResult<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build a TCP client
    ///
    /// No connection is made until the first operation.
    pub fn build(self) -> NutResult<NutClient<TcpTransport>> {
        Ok(NutClient::new(self.build_config()?))
    }
}
