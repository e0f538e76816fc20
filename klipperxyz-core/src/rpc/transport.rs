//! # Transport Contract
//!
//! The traits a Moonraker client library has to satisfy for the session layer to drive it.
//!
//! A [`Connector`] opens a fresh [`Transport`] to an [`Endpoint`]. The transport performs
//! method calls and is consumed by [`Transport::disconnect`], so a closed transport can
//! never be used again.
use super::{Endpoint, Params};
use crate::BoxError;
use std::future::Future;
use std::time::Duration;

/// Errors that can occur while establishing a transport.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Failed to connect to '{url}': '{source}'")]
    Failed {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("Timed out after {1:?} connecting to '{0}'")]
    Timeout(String, Duration),
}

/// Errors that can occur while calling a remote method.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Transport failure: '{0}'")]
    Transport(#[source] BoxError),
    #[error("No response after {0:?}")]
    Timeout(Duration),
    #[error("Connection closed before a response arrived")]
    Closed,
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Server error {code}: {message}")]
    Rpc { code: i64, message: String },
}

/// Errors that can occur while tearing down a transport.
#[derive(Debug, thiserror::Error)]
pub enum DisconnectError {
    #[error("Failed to close the connection: '{0}'")]
    Transport(#[source] BoxError),
    #[error("Closing the connection took longer than {0:?}")]
    Timeout(Duration),
}

/// Opens transports to a Moonraker endpoint.
pub trait Connector: Send + Sync {
    type Transport: Transport;

    fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<Self::Transport, ConnectError>> + Send;
}

/// One open connection to a Moonraker server.
pub trait Transport: Send {
    /// Calls `method` and waits for its result.
    fn call_method(
        &mut self,
        method: &str,
        params: Option<&Params>,
    ) -> impl Future<Output = Result<serde_json::Value, CallError>> + Send;

    /// Fetches the `server.info` object.
    fn get_server_info(
        &mut self,
    ) -> impl Future<Output = Result<serde_json::Value, CallError>> + Send;

    fn disconnect(self) -> impl Future<Output = Result<(), DisconnectError>> + Send;
}
