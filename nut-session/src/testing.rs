//! Scripted transport for unit tests

use crate::error::{NutError, NutResult};
use async_trait::async_trait;
use nut_transport::{StreamAccessor, TransportLayer};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_test::io::Mock;

/// Transport replaying one scripted conversation per `open`
///
/// Opening with no script left fails like a refused connect.
pub(crate) struct ScriptedTransport {
    scripts: VecDeque<Mock>,
    current: Option<Mutex<Mock>>,
    pub(crate) opens: usize,
}

impl ScriptedTransport {
    pub(crate) fn new(scripts: Vec<Mock>) -> Self {
        Self {
            scripts: scripts.into(),
            current: None,
            opens: 0,
        }
    }

    /// Start the first conversation without going through `open`
    pub(crate) fn open_now(&mut self) {
        self.current = self.scripts.pop_front().map(Mutex::new);
    }

    fn io(&mut self) -> NutResult<&mut Mock> {
        let current = self.current.as_mut().ok_or_else(|| {
            NutError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "scripted transport not open",
            ))
        })?;
        current
            .get_mut()
            .map_err(|_| NutError::Protocol("scripted transport poisoned".to_string()))
    }
}

#[async_trait]
impl StreamAccessor for ScriptedTransport {
    async fn read(&mut self, buf: &mut [u8]) -> NutResult<usize> {
        let io = self.io()?;
        Ok(io.read(buf).await?)
    }

    async fn write(&mut self, buf: &[u8]) -> NutResult<usize> {
        let io = self.io()?;
        Ok(io.write(buf).await?)
    }

    async fn flush(&mut self) -> NutResult<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.current.is_none()
    }

    async fn close(&mut self) -> NutResult<()> {
        self.current = None;
        Ok(())
    }
}

#[async_trait]
impl TransportLayer for ScriptedTransport {
    async fn open(&mut self) -> NutResult<()> {
        let script = self.scripts.pop_front().ok_or_else(|| {
            NutError::Connection(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "no scripted conversation left",
            ))
        })?;
        self.current = Some(Mutex::new(script));
        self.opens += 1;
        Ok(())
    }

    fn peer(&self) -> String {
        "scripted".to_string()
    }
}
