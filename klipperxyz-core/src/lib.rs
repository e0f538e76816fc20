//! # KlipperXYZ Core
//!
//! `klipperxyz-core` is the library behind the `klipperxyz` CLI. It drives a 3D printer
//! running Klipper through the Moonraker JSON-RPC websocket API: homing, absolute moves,
//! emergency stops, position queries and XY sweeps.
//!
//! ## Key Components
//!
//! * **[`KlipperClient`](client::KlipperClient):** The main entry point. Each operation builds
//!   a [`Command`](command::Command) and dispatches it.
//! * **[`Dispatcher`](dispatch::Dispatcher):** Runs one command through a fresh
//!   [`RpcSession`](session::RpcSession) per attempt, retrying transient failures up to
//!   [`MAX_ATTEMPTS`](dispatch::MAX_ATTEMPTS) times.
//! * **[`Sweep`](sweep::Sweep):** A lazy stream that moves the head across a grid, one point
//!   per poll.
//!
//! ## Transport
//!
//! Sessions are generic over the [`Connector`](rpc::Connector) and
//! [`Transport`](rpc::Transport) traits. The default implementation speaks JSON-RPC 2.0
//! over a websocket to `ws://{host}:7125/websocket`.
//!
//! ## Re-exports
//!
//! This crate re-exports `serde_json`, since results are returned as `serde_json::Value`.
pub mod client;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod rpc;
pub mod session;
pub mod sweep;

#[cfg(test)]
mod testing;

// Re-exports
pub use serde_json;

/// Type alias for the standard boxed error used as an error source.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
