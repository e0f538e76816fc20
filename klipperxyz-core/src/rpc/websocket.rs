//! # Websocket Transport
//!
//! The production [`Connector`]/[`Transport`] pair. Each [`WebSocketTransport`] owns one
//! websocket to `ws://{host}:{port}/websocket` and exchanges JSON-RPC 2.0 messages over it
//! using the [`super::codec`] module.
//!
//! ## Features
//!
//! * **Bounded waits**: The handshake, every call and the closing handshake are wrapped in
//!   a timeout.
//! * **Notification tolerant**: Messages that are not the reply to the pending request
//!   are skipped while waiting.
//! * **Clean shutdown**: [`Transport::disconnect`] sends a websocket Close frame.
use super::{
    Endpoint, Params, codec,
    transport::{CallError, ConnectError, Connector, DisconnectError, Transport},
};
use crate::command::SERVER_INFO;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::{net::TcpStream, time::timeout};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message},
};

/// Default handshake timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default call timeout in seconds.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Opens [`WebSocketTransport`]s.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
    call_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(connect_timeout: Duration, call_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            call_timeout,
        }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        )
    }
}

impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, endpoint: &Endpoint) -> Result<WebSocketTransport, ConnectError> {
        let url = endpoint.websocket_url();

        let (stream, _response) = timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| ConnectError::Timeout(url.clone(), self.connect_timeout))?
            .map_err(|e| ConnectError::Failed {
                url: url.clone(),
                source: e.into(),
            })?;

        Ok(WebSocketTransport {
            stream,
            next_id: 1,
            call_timeout: self.call_timeout,
        })
    }
}

/// One websocket connection to Moonraker.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_id: u64,
    call_timeout: Duration,
}

impl WebSocketTransport {
    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Sends a request and waits for the reply with the same id (internal, no timeout).
    async fn send_receive(
        &mut self,
        id: u64,
        request: String,
    ) -> Result<serde_json::Value, CallError> {
        self.stream
            .send(Message::text(request))
            .await
            .map_err(|e| CallError::Transport(e.into()))?;

        while let Some(message) = self.stream.next().await {
            match message.map_err(|e| CallError::Transport(e.into()))? {
                Message::Text(text) => {
                    if let Some(value) = codec::decode_reply(text.as_str(), id)? {
                        return Ok(value);
                    }
                }
                Message::Close(_) => return Err(CallError::Closed),
                // Pings are answered by tungstenite itself
                _ => {}
            }
        }

        Err(CallError::Closed)
    }
}

impl Transport for WebSocketTransport {
    async fn call_method(
        &mut self,
        method: &str,
        params: Option<&Params>,
    ) -> Result<serde_json::Value, CallError> {
        let id = self.next_id();
        let request = codec::encode_request(id, method, params)?;
        let limit = self.call_timeout;

        timeout(limit, self.send_receive(id, request))
            .await
            .map_err(|_| CallError::Timeout(limit))?
    }

    async fn get_server_info(&mut self) -> Result<serde_json::Value, CallError> {
        self.call_method(SERVER_INFO, None).await
    }

    async fn disconnect(mut self) -> Result<(), DisconnectError> {
        let limit = self.call_timeout;

        // A peer that stopped reading never lets the Close frame flush
        match timeout(limit, self.stream.close(None)).await {
            Err(_) => Err(DisconnectError::Timeout(limit)),
            Ok(Ok(()))
            | Ok(Err(tungstenite::Error::ConnectionClosed))
            | Ok(Err(tungstenite::Error::AlreadyClosed)) => Ok(()),
            Ok(Err(e)) => Err(DisconnectError::Transport(e.into())),
        }
    }
}
