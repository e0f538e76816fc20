//! # RPC Session
//!
//! One open-and-close cycle of a transport, scoped to a single call.
//!
//! A session is created right before a call and destroyed right after it. It is never
//! stored on the client and never reused: [`RpcSession::close`] consumes it. The scoped
//! entry point is [`RpcSession::exchange`], which closes the session on every exit path,
//! including a failed call.
use crate::{
    command::Command,
    rpc::{CallError, ConnectError, Connector, DisconnectError, Endpoint, Transport},
};
use serde_json::Value;

/// What to do with a session once it is open.
#[derive(Debug, Clone, Copy)]
pub enum Request<'a> {
    /// Call a remote method.
    Call(&'a Command),
    /// Fetch the server information.
    ServerInfo,
}

impl Request<'_> {
    pub fn method(&self) -> &str {
        match self {
            Request::Call(command) => command.method(),
            Request::ServerInfo => crate::command::SERVER_INFO,
        }
    }
}

/// Errors that can occur during a session exchange.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Call(#[from] CallError),
}

impl SessionError {
    /// Whether a new session might succeed where this one failed.
    ///
    /// Everything is transient except an error the server answered with: it received the
    /// request and rejected it, so sending it again gives the same answer.
    pub fn is_transient(&self) -> bool {
        !matches!(self, SessionError::Call(CallError::Rpc { .. }))
    }
}

/// An open transport, owned by exactly one call sequence.
pub struct RpcSession<T> {
    transport: T,
}

impl<T: Transport> RpcSession<T> {
    /// Opens a fresh transport to `endpoint`.
    pub async fn open<C>(connector: &C, endpoint: &Endpoint) -> Result<Self, ConnectError>
    where
        C: Connector<Transport = T>,
    {
        let transport = connector.connect(endpoint).await?;
        tracing::debug!(%endpoint, "session opened");
        Ok(Self { transport })
    }

    pub async fn call(&mut self, command: &Command) -> Result<Value, CallError> {
        self.transport
            .call_method(command.method(), command.params())
            .await
    }

    pub async fn server_info(&mut self) -> Result<Value, CallError> {
        self.transport.get_server_info().await
    }

    pub async fn close(self) -> Result<(), DisconnectError> {
        self.transport.disconnect().await?;
        tracing::debug!("session closed");
        Ok(())
    }

    /// Opens a session, performs `request` and closes the session again.
    ///
    /// The session is closed whether or not the request succeeded. A failure to close is
    /// logged but does not change the outcome: by then the request has either executed on
    /// the device or already failed.
    pub async fn exchange<C>(
        connector: &C,
        endpoint: &Endpoint,
        request: &Request<'_>,
    ) -> Result<Value, SessionError>
    where
        C: Connector<Transport = T>,
    {
        let mut session = Self::open(connector, endpoint).await?;

        let outcome = match request {
            Request::Call(command) => session.call(command).await,
            Request::ServerInfo => session.server_info().await,
        };

        if let Err(err) = session.close().await {
            tracing::warn!(method = request.method(), error = %err, "failed to close session");
        }

        Ok(outcome?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Outcome, ScriptedConnector};
    use serde_json::json;

    fn endpoint() -> Endpoint {
        Endpoint::new("printer.local", 7125)
    }

    #[tokio::test]
    async fn test_exchange_closes_after_success() {
        let connector = ScriptedConnector::new([Outcome::Reply(json!("ok"))]);
        let command = Command::home();

        let value = RpcSession::exchange(&connector, &endpoint(), &Request::Call(&command))
            .await
            .unwrap();

        assert_eq!(value, json!("ok"));
        assert_eq!(connector.opens(), 1);
        assert_eq!(connector.closes(), 1);
        assert_eq!(connector.calls(), vec![command]);
    }

    #[tokio::test]
    async fn test_exchange_closes_after_failed_call() {
        let connector = ScriptedConnector::new([Outcome::CallFailure]);
        let command = Command::home();

        let err = RpcSession::exchange(&connector, &endpoint(), &Request::Call(&command))
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Call(CallError::Transport(_))));
        assert_eq!(connector.opens(), 1);
        assert_eq!(connector.closes(), 1);
    }

    #[tokio::test]
    async fn test_exchange_without_connection_has_nothing_to_close() {
        let connector = ScriptedConnector::new([Outcome::ConnectFailure]);
        let command = Command::home();

        let err = RpcSession::exchange(&connector, &endpoint(), &Request::Call(&command))
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Connect(_)));
        assert_eq!(connector.opens(), 0);
        assert_eq!(connector.closes(), 0);
    }

    #[tokio::test]
    async fn test_exchange_keeps_result_when_close_fails() {
        let connector = ScriptedConnector::new([Outcome::Reply(json!("ok"))]).failing_close();
        let command = Command::emergency_stop();

        let value = RpcSession::exchange(&connector, &endpoint(), &Request::Call(&command))
            .await
            .unwrap();

        assert_eq!(value, json!("ok"));
        assert_eq!(connector.closes(), 1);
    }

    #[tokio::test]
    async fn test_server_info_request() {
        let info = json!({ "klippy_state": "ready" });
        let connector = ScriptedConnector::new([Outcome::Reply(info.clone())]);

        let value = RpcSession::exchange(&connector, &endpoint(), &Request::ServerInfo)
            .await
            .unwrap();

        assert_eq!(value, info);
        assert_eq!(connector.server_info_requests(), 1);
        assert_eq!(connector.opens(), connector.closes());
    }

    #[test]
    fn test_transient_classification() {
        let rejected = SessionError::Call(CallError::Rpc {
            code: 400,
            message: "Must home axis first".to_string(),
        });
        assert!(!rejected.is_transient());

        assert!(SessionError::Call(CallError::Closed).is_transient());

        let timed_out = SessionError::Connect(ConnectError::Timeout(
            "ws://printer.local:7125/websocket".to_string(),
            std::time::Duration::from_secs(1),
        ));
        assert!(timed_out.is_transient());
    }
}
