//! # Mock Moonraker
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide an in-process Moonraker
//! websocket server for integration testing `klipperxyz-core`.
//! It is not intended for production use.
//!
//! The server answers the handful of methods the client uses, tracks a fake G-code
//! position from the `G1`/`G28` scripts it receives, and records every request. It can be
//! told to drop the next N connections before the websocket handshake, or to misbehave
//! after it: leave requests unanswered, hang up on them, or stop reading altogether.
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// A request received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub params: Option<Value>,
}

/// What the server does with a connection once the handshake is done.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum Behavior {
    #[default]
    Answer,
    /// Record requests but never reply.
    Stall,
    /// Reply to a request with a Close frame.
    HangUp,
    /// Never read from the socket again.
    Deaf,
}

#[derive(Default)]
struct State {
    requests: Mutex<Vec<RecordedRequest>>,
    position: Mutex<[f64; 4]>,
    behavior: Mutex<Behavior>,
    refuse: AtomicUsize,
    refused: AtomicUsize,
    handshakes: AtomicUsize,
    closes: AtomicUsize,
    hangups: AtomicUsize,
}

pub struct MockMoonraker {
    addr: SocketAddr,
    state: Arc<State>,
    task: JoinHandle<()>,
}

impl MockMoonraker {
    /// Binds to an ephemeral port on localhost and starts serving.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(State::default());

        let task = tokio::spawn(serve(listener, state.clone()));

        Ok(Self { addr, state, task })
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Drops the next `count` connections before the handshake.
    pub fn refuse_next(&self, count: usize) {
        self.state.refuse.store(count, Ordering::SeqCst);
    }

    pub fn refused(&self) -> usize {
        self.state.refused.load(Ordering::SeqCst)
    }

    /// Records requests without ever answering them.
    pub fn stall_replies(&self) {
        *lock(&self.state.behavior) = Behavior::Stall;
    }

    /// Answers every request by closing the websocket.
    pub fn hang_up_on_requests(&self) {
        *lock(&self.state.behavior) = Behavior::HangUp;
    }

    /// Keeps new connections open after the handshake but never reads from them.
    pub fn stop_reading(&self) {
        *lock(&self.state.behavior) = Behavior::Deaf;
    }

    /// Number of connections the server closed in reply to a request.
    pub fn hangups(&self) -> usize {
        self.state.hangups.load(Ordering::SeqCst)
    }

    /// Number of completed websocket handshakes.
    pub fn handshakes(&self) -> usize {
        self.state.handshakes.load(Ordering::SeqCst)
    }

    /// Number of connections the client closed with a Close frame.
    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Waits until `count` connections have been closed by the client, or a second passed.
    pub async fn wait_for_closes(&self, count: usize) -> usize {
        for _ in 0..100 {
            if self.closes() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.closes()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    /// The `script` parameter of every `printer.gcode.script` request, in order.
    pub fn scripts(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == "printer.gcode.script")
            .filter_map(|request| Some(request.params?.get("script")?.as_str()?.to_string()))
            .collect()
    }

    pub fn position(&self) -> [f64; 4] {
        *lock(&self.state.position)
    }
}

impl Drop for MockMoonraker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

async fn serve(listener: TcpListener, state: Arc<State>) {
    while let Ok((stream, _)) = listener.accept().await {
        let refuse = state
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if refuse {
            state.refused.fetch_add(1, Ordering::SeqCst);
            drop(stream);
            continue;
        }

        tokio::spawn(handle_connection(stream, state.clone()));
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<State>) {
    let mut ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            tracing::debug!(error = %err, "handshake failed");
            return;
        }
    };
    state.handshakes.fetch_add(1, Ordering::SeqCst);

    let behavior = *lock(&state.behavior);
    if behavior == Behavior::Deaf {
        // Holds `ws` open until the runtime shuts down
        std::future::pending::<()>().await;
    }

    while let Some(Ok(message)) = ws.next().await {
        match message {
            Message::Text(text) => {
                let Ok(request) = serde_json::from_str::<Value>(text.as_str()) else {
                    continue;
                };
                record(&state, &request);

                match behavior {
                    Behavior::Stall => continue,
                    Behavior::HangUp => {
                        state.hangups.fetch_add(1, Ordering::SeqCst);
                        if ws.close(None).await.is_ok() {
                            // Drain until the client acknowledges the Close frame
                            while let Some(Ok(_)) = ws.next().await {}
                        }
                        return;
                    }
                    Behavior::Answer | Behavior::Deaf => {}
                }

                for reply in respond(&state, &request) {
                    if ws.send(Message::text(reply.to_string())).await.is_err() {
                        return;
                    }
                }
            }
            Message::Close(_) => {
                state.closes.fetch_add(1, Ordering::SeqCst);
                break;
            }
            _ => {}
        }
    }
}

fn record(state: &State, request: &Value) {
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default();

    lock(&state.requests).push(RecordedRequest {
        method: method.to_string(),
        params: request.get("params").cloned(),
    });
}

/// The messages sent back for one request: notifications first, then the reply.
fn respond(state: &State, request: &Value) -> Vec<Value> {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str);
    let params = request.get("params");

    let reply = |result: Value| json!({ "jsonrpc": "2.0", "result": result, "id": id });

    match method.unwrap_or_default() {
        "printer.gcode.script" => {
            let script = params
                .and_then(|p| p.get("script"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            apply_script(&mut lock(&state.position), script);

            vec![
                json!({
                    "jsonrpc": "2.0",
                    "method": "notify_gcode_response",
                    "params": [format!("// {}", script.replace('\n', " "))]
                }),
                reply(json!("ok")),
            ]
        }
        "printer.emergency_stop" => vec![reply(json!("ok"))],
        "printer.objects.query" => {
            let position = *lock(&state.position);
            vec![reply(json!({
                "eventtime": 578243.57,
                "status": { "gcode_move": { "gcode_position": position } }
            }))]
        }
        "server.info" => vec![reply(json!({
            "klippy_connected": true,
            "klippy_state": "ready",
            "moonraker_version": "mock"
        }))],
        _ => vec![json!({
            "jsonrpc": "2.0",
            "error": { "code": -32601, "message": "Method not found" },
            "id": id
        })],
    }
}

fn apply_script(position: &mut [f64; 4], script: &str) {
    for line in script.lines() {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("G28") => *position = [0.0; 4],
            Some("G1") | Some("G0") => {
                for word in words {
                    let (axis, value) = word.split_at(1);
                    let Ok(value) = value.parse::<f64>() else {
                        continue;
                    };
                    match axis {
                        "X" => position[0] = value,
                        "Y" => position[1] = value,
                        "Z" => position[2] = value,
                        "E" => position[3] = value,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}
