//! # Client Configuration
//!
//! Everything a [`crate::client::KlipperClient`] needs to know about its printer, with the
//! defaults Moonraker installations use.
use crate::{
    dispatch::MAX_ATTEMPTS,
    rpc::{
        DEFAULT_PORT, Endpoint,
        websocket::{DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS},
    },
};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Hostname or IP address of the Moonraker instance (e.g. `mainsailos.local`).
    pub host: String,
    pub port: u16,
    /// Attempts per command before giving up.
    pub max_attempts: u32,
    /// Bound on the websocket handshake.
    pub connect_timeout: Duration,
    /// Bound on waiting for the reply to a call.
    pub call_timeout: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            max_attempts: MAX_ATTEMPTS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }
}
