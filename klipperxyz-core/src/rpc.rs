//! # Moonraker RPC Transport
//!
//! This module contains the low-level building blocks for talking to a Moonraker server.
//!
//! The session and dispatch layers never touch a socket directly. They are generic over
//! the [`Connector`] and [`Transport`] traits defined in [`transport`], and the
//! [`websocket`] module provides the production implementation: JSON-RPC 2.0 messages
//! (see [`codec`]) exchanged over a websocket.
pub mod codec;
pub mod transport;
pub mod websocket;

pub use transport::{CallError, ConnectError, Connector, DisconnectError, Transport};
pub use websocket::{WebSocketConnector, WebSocketTransport};

use std::fmt;

/// Port the Moonraker API listens on.
pub const DEFAULT_PORT: u16 = 7125;

/// Named parameters of a JSON-RPC call.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Network address of the Moonraker instance driving the printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The Moonraker websocket route for this endpoint, e.g. `ws://mainsailos.local:7125/websocket`.
    pub fn websocket_url(&self) -> String {
        format!("ws://{}/websocket", self)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // IPv6 literals must be bracketed to be usable in a URL authority
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
