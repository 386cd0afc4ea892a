//! Retry supervisor
//!
//! Wraps a single attempt of a request. When the attempt fails because the
//! connection broke (reset, end of stream, timeout), the supervisor
//! reconnects and replays the request, at most `max_retries` times (one by
//! default). Replies from upsd, including `ERR` replies, are never retried.
//!
//! Nothing is logged for a drop that heals on replay. If the replay fails
//! too, the first failure is logged and the replay's error is returned
//! unchanged.

use async_trait::async_trait;
use nut_core::{NutError, NutResult};
use nut_session::{Command, Credentials, Response};
use std::fmt;

/// What the supervisor replays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// One command round trip
    Command(Command),
    /// The `USERNAME`/`PASSWORD` exchange of an explicit login
    Login(Credentials),
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Command(command) => write!(f, "{}", command),
            Request::Login(credentials) => write!(f, "login as {}", credentials.username),
        }
    }
}

/// Target a request is attempted against
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Replay: Send {
    /// Attempt the request once on the current connection
    async fn attempt(&mut self, request: &Request) -> NutResult<Response>;

    /// Replace the connection, logging in again if the target has credentials
    async fn reconnect(&mut self) -> NutResult<()>;
}

/// Bounded reconnect-and-replay policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySupervisor {
    max_retries: u32,
}

impl Default for RetrySupervisor {
    fn default() -> Self {
        Self { max_retries: 1 }
    }
}

impl RetrySupervisor {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `request` against `target`
    ///
    /// # Errors
    /// - a non-transport error from any attempt, immediately
    /// - the error of the last attempt once retries are exhausted
    /// - the reconnect error if reconnecting fails
    pub async fn run<R>(&self, target: &mut R, request: &Request) -> NutResult<Response>
    where
        R: Replay + ?Sized,
    {
        let mut first_failure: Option<NutError> = None;
        let mut retries = 0;

        loop {
            let error = match target.attempt(request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !error.is_transport() || retries >= self.max_retries {
                if let Some(first) = &first_failure {
                    log::warn!(
                        "`{}` failed ({}) and failed again after reconnecting: {}",
                        request,
                        first,
                        error
                    );
                }
                return Err(error);
            }

            retries += 1;
            if let Err(reconnect_error) = target.reconnect().await {
                log::warn!(
                    "`{}` failed ({}) and reconnecting failed: {}",
                    request,
                    error,
                    reconnect_error
                );
                return Err(reconnect_error);
            }
            first_failure.get_or_insert(error);
        }
    }
}
