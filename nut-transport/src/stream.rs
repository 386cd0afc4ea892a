//! Stream accessor trait for transport layer

use crate::error::{NutError, NutResult};
use async_trait::async_trait;

/// Stream accessor interface to the byte stream of a UPS daemon connection
#[async_trait]
pub trait StreamAccessor: Send + Sync {
    /// Read data from the stream
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 if EOF
    async fn read(&mut self, buf: &mut [u8]) -> NutResult<usize>;

    /// Write data to the stream
    ///
    /// # Returns
    ///
    /// Number of bytes written
    async fn write(&mut self, buf: &[u8]) -> NutResult<usize>;

    /// Write all data to the stream
    async fn write_all(&mut self, buf: &[u8]) -> NutResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(NutError::Connection(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "Failed to write all data",
                )));
            }
            written += n;
        }
        Ok(())
    }

    /// Flush any buffered data
    async fn flush(&mut self) -> NutResult<()>;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Close the stream
    async fn close(&mut self) -> NutResult<()>;
}

/// Transport layer trait that extends StreamAccessor
///
/// A transport can be opened again after [`StreamAccessor::close`]; this is
/// how the connection manager reconnects without rebuilding its settings.
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    /// Open the physical layer connection
    async fn open(&mut self) -> NutResult<()>;

    /// Human-readable peer description for log records
    fn peer(&self) -> String;
}
