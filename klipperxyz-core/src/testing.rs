//! A connector whose outcomes are scripted per attempt, for unit tests.
use crate::{
    command::Command,
    rpc::{CallError, ConnectError, Connector, DisconnectError, Endpoint, Params, Transport},
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// What the next connect or call does. Unscripted calls reply `"ok"`.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The connection attempt fails.
    ConnectFailure,
    /// The connection succeeds and the call fails in transit.
    CallFailure,
    /// The connection succeeds and the server rejects the call.
    Rejected,
    /// The connection succeeds and the call returns the value.
    Reply(Value),
}

#[derive(Default)]
struct Inner {
    script: Mutex<VecDeque<Outcome>>,
    calls: Mutex<Vec<Command>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    server_info_requests: AtomicUsize,
    fail_close: AtomicBool,
}

#[derive(Clone, Default)]
pub struct ScriptedConnector {
    inner: Arc<Inner>,
}

impl ScriptedConnector {
    pub fn new(script: impl IntoIterator<Item = Outcome>) -> Self {
        let connector = Self::default();
        connector.inner.script.lock().unwrap().extend(script);
        connector
    }

    pub fn failing_close(self) -> Self {
        self.inner.fail_close.store(true, Ordering::SeqCst);
        self
    }

    pub fn opens(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    pub fn server_info_requests(&self) -> usize {
        self.inner.server_info_requests.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Command> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|command| command.script().map(str::to_string))
            .collect()
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self, endpoint: &Endpoint) -> Result<ScriptedTransport, ConnectError> {
        let mut script = self.inner.script.lock().unwrap();

        if matches!(script.front(), Some(Outcome::ConnectFailure)) {
            script.pop_front();
            return Err(ConnectError::Failed {
                url: endpoint.websocket_url(),
                source: "connection refused".into(),
            });
        }

        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedTransport {
            inner: self.inner.clone(),
        })
    }
}

pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

impl ScriptedTransport {
    fn next_outcome(&self) -> Result<Value, CallError> {
        let outcome = self.inner.script.lock().unwrap().pop_front();

        match outcome {
            None => Ok(json!("ok")),
            Some(Outcome::Reply(value)) => Ok(value),
            Some(Outcome::CallFailure) => Err(CallError::Transport("connection reset".into())),
            Some(Outcome::Rejected) => Err(CallError::Rpc {
                code: 400,
                message: "Must home axis first".to_string(),
            }),
            Some(Outcome::ConnectFailure) => panic!("connect failure scripted for a call"),
        }
    }
}

impl Transport for ScriptedTransport {
    async fn call_method(
        &mut self,
        method: &str,
        params: Option<&Params>,
    ) -> Result<Value, CallError> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .push(Command::new(method, params.cloned()));
        self.next_outcome()
    }

    async fn get_server_info(&mut self) -> Result<Value, CallError> {
        self.inner
            .server_info_requests
            .fetch_add(1, Ordering::SeqCst);
        self.next_outcome()
    }

    async fn disconnect(self) -> Result<(), DisconnectError> {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);

        if self.inner.fail_close.load(Ordering::SeqCst) {
            return Err(DisconnectError::Transport("broken pipe".into()));
        }
        Ok(())
    }
}
