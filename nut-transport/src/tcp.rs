//! TCP transport implementation

use crate::error::{NutError, NutResult};
use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default port of the upsd network server
pub const DEFAULT_PORT: u16 = 3493;

/// Wrapper for TcpStream that implements Debug
struct DebugTcpStream(TcpStream);

impl fmt::Debug for DebugTcpStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpStream").finish()
    }
}

impl Deref for DebugTcpStream {
    type Target = TcpStream;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DebugTcpStream {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// TCP transport layer settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    pub host: String,
    pub port: u16,
    /// Bound on establishing the TCP connection
    pub connect_timeout: Option<Duration>,
    /// Bound on each individual read or write
    pub timeout: Option<Duration>,
}

impl TcpSettings {
    /// Create new TCP settings
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Some(Duration::from_secs(5)),
            timeout: None,
        }
    }

    /// Create TCP settings with a connect timeout
    pub fn with_connect_timeout(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            connect_timeout: Some(timeout),
            ..Self::new(host, port)
        }
    }
}

fn not_connected() -> NutError {
    NutError::Connection(std::io::Error::new(
        std::io::ErrorKind::NotConnected,
        "TCP stream not connected",
    ))
}

/// TCP transport layer implementation
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<DebugTcpStream>,
    settings: TcpSettings,
    closed: bool,
}

impl TcpTransport {
    /// Create a new TCP transport layer
    pub fn new(settings: TcpSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }
}

#[async_trait]
impl TransportLayer for TcpTransport {
    async fn open(&mut self) -> NutResult<()> {
        if !self.closed {
            return Err(NutError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let address = (self.settings.host.as_str(), self.settings.port);
        // A connect that outlives its bound is an unreachable host, not a command timeout
        let stream = if let Some(timeout) = self.settings.connect_timeout {
            tokio::time::timeout(timeout, TcpStream::connect(address))
                .await
                .map_err(|_| {
                    NutError::Connection(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("connect to {} timed out after {:?}", self.peer(), timeout),
                    ))
                })??
        } else {
            TcpStream::connect(address).await?
        };

        if let Err(e) = stream.set_nodelay(true) {
            log::debug!("Failed to set TCP_NODELAY on {}: {}", self.peer(), e);
        }

        self.stream = Some(DebugTcpStream(stream));
        self.closed = false;
        Ok(())
    }

    fn peer(&self) -> String {
        format!("{}:{}", self.settings.host, self.settings.port)
    }
}

#[async_trait]
impl StreamAccessor for TcpTransport {
    async fn read(&mut self, buf: &mut [u8]) -> NutResult<usize> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;

        let result = if let Some(timeout) = self.settings.timeout {
            tokio::time::timeout(timeout, stream.read(buf))
                .await
                .map_err(|_| NutError::Timeout(timeout))
                .and_then(|r| r.map_err(NutError::Connection))
        } else {
            stream.read(buf).await.map_err(NutError::Connection)
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> NutResult<usize> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;

        let result = if let Some(timeout) = self.settings.timeout {
            tokio::time::timeout(timeout, stream.write(buf))
                .await
                .map_err(|_| NutError::Timeout(timeout))
                .and_then(|r| r.map_err(NutError::Connection))
        } else {
            stream.write(buf).await.map_err(NutError::Connection)
        };

        if result.is_err() {
            self.closed = true;
        }
        result
    }

    async fn flush(&mut self) -> NutResult<()> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        stream.flush().await.map_err(NutError::Connection)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> NutResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_tcp_settings() {
        let settings = TcpSettings::new("localhost", DEFAULT_PORT);
        assert_eq!(settings.port, 3493);
        assert!(settings.connect_timeout.is_some());
        assert!(settings.timeout.is_none());
    }

    #[tokio::test]
    async fn test_open_write_read_and_reopen() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            for _ in 0..2 {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 16];
                let n = socket.read(&mut buf).await.unwrap();
                socket.write_all(&buf[..n]).await.unwrap();
            }
        });

        let mut transport = TcpTransport::new(TcpSettings::new("127.0.0.1", port));
        assert!(transport.is_closed());
        for _ in 0..2 {
            transport.open().await.unwrap();
            assert!(!transport.is_closed());
            transport.write_all(b"VER\n").await.unwrap();
            transport.flush().await.unwrap();
            let mut buf = [0u8; 16];
            let n = transport.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"VER\n");
            transport.close().await.unwrap();
            assert!(transport.is_closed());
        }
    }

    #[tokio::test]
    async fn test_open_twice_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut transport = TcpTransport::new(TcpSettings::new("127.0.0.1", port));
        transport.open().await.unwrap();
        assert!(matches!(transport.open().await, Err(NutError::Connection(_))));
    }

    #[tokio::test]
    async fn test_refused_is_connection_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut transport = TcpTransport::new(TcpSettings::new("127.0.0.1", port));
        let err = transport.open().await.unwrap_err();
        assert!(matches!(err, NutError::Connection(_)));
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut settings = TcpSettings::new("127.0.0.1", port);
        settings.timeout = Some(Duration::from_millis(50));
        let mut transport = TcpTransport::new(settings);
        transport.open().await.unwrap();
        let (_socket, _) = listener.accept().await.unwrap();

        let mut buf = [0u8; 8];
        let err = transport.read(&mut buf).await.unwrap_err();
        assert!(matches!(err, NutError::Timeout(_)));
        assert!(transport.is_closed());
    }
}
