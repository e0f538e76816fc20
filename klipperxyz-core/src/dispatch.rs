//! # Command Dispatcher
//!
//! Executes one [`Command`] against the device, retrying transient failures.
//!
//! Every attempt runs in a brand new [`RpcSession`], so a failed attempt can never leave a
//! half-used connection behind for the next one. There is no delay between attempts.
//!
//! Which failures are worth another attempt is decided by a [`RetryPolicy`]. The default
//! retries every transport failure but not an error the server answered with.
use crate::{
    command::Command,
    rpc::{Connector, Endpoint},
    session::{Request, RpcSession, SessionError},
};
use serde_json::Value;

/// Number of attempts a command gets by default.
pub const MAX_ATTEMPTS: u32 = 5;

/// How many times a command is attempted, and which failures are retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    retryable: fn(&SessionError) -> bool,
}

impl RetryPolicy {
    /// A policy allowing `max_attempts` attempts (at least one) that retries the failures
    /// for which `retryable` returns true.
    pub fn new(max_attempts: u32, retryable: fn(&SessionError) -> bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retryable,
        }
    }

    /// Treats every failure as transient, server rejections included.
    pub fn retry_all() -> Self {
        Self::new(MAX_ATTEMPTS, |_| true)
    }

    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self::new(max_attempts, self.retryable)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_retryable(&self, err: &SessionError) -> bool {
        (self.retryable)(err)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS, SessionError::is_transient)
    }
}

/// Errors that can occur when dispatching a command.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("'{method}' failed after {attempts} attempts: {last}")]
    Exhausted {
        method: String,
        attempts: u32,
        #[source]
        last: SessionError,
    },
    #[error("'{method}' failed: {source}")]
    Failed {
        method: String,
        #[source]
        source: SessionError,
    },
}

impl DispatchError {
    /// The session error that ended the dispatch.
    pub fn session_error(&self) -> &SessionError {
        match self {
            DispatchError::Exhausted { last, .. } => last,
            DispatchError::Failed { source, .. } => source,
        }
    }
}

/// Runs commands against one endpoint through fresh sessions.
#[derive(Debug, Clone)]
pub struct Dispatcher<C> {
    connector: C,
    endpoint: Endpoint,
    policy: RetryPolicy,
}

impl<C: Connector> Dispatcher<C> {
    pub fn new(connector: C, endpoint: Endpoint) -> Self {
        Self {
            connector,
            endpoint,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(self, policy: RetryPolicy) -> Self {
        Self { policy, ..self }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Executes `command`, returning the first successful result.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The result of the first attempt that succeeded.
    /// * `Err(DispatchError::Failed)` - An attempt failed with a non-retryable error.
    /// * `Err(DispatchError::Exhausted)` - Every allowed attempt failed.
    pub async fn dispatch(&self, command: &Command) -> Result<Value, DispatchError> {
        let max_attempts = self.policy.max_attempts();
        let request = Request::Call(command);
        let mut attempt = 1;

        loop {
            match RpcSession::exchange(&self.connector, &self.endpoint, &request).await {
                Ok(value) => return Ok(value),
                Err(err) if !self.policy.is_retryable(&err) => {
                    return Err(DispatchError::Failed {
                        method: command.method().to_string(),
                        source: err,
                    });
                }
                Err(err) if attempt >= max_attempts => {
                    tracing::error!(
                        method = command.method(),
                        attempts = attempt,
                        error = %err,
                        "giving up"
                    );
                    return Err(DispatchError::Exhausted {
                        method: command.method().to_string(),
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        method = command.method(),
                        attempt,
                        max_attempts,
                        error = %err,
                        "attempt failed, retrying"
                    );
                }
            }

            attempt += 1;
        }
    }

    /// Fetches the server information in a single session, without retrying.
    pub async fn server_info(&self) -> Result<Value, DispatchError> {
        let request = Request::ServerInfo;

        RpcSession::exchange(&self.connector, &self.endpoint, &request)
            .await
            .map_err(|source| DispatchError::Failed {
                method: request.method().to_string(),
                source,
            })
    }
}
