//! # Klipper Client
//!
//! The high-level API for controlling a Klipper printer through Moonraker.
//!
//! The client only holds the endpoint configuration. Every operation builds its
//! [`Command`], hands it to the [`Dispatcher`] (fresh session, bounded retries) and decodes
//! the result. No connection outlives the operation that opened it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use klipperxyz_core::client::KlipperClient;
//! use klipperxyz_core::command::MoveRequest;
//! use klipperxyz_core::sweep::SweepRegion;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KlipperClient::new("mainsailos.local");
//!
//! // Home the stepper motors before anything else
//! client.home().await?;
//!
//! client.move_to(MoveRequest::new().x(100.0).y(100.0).z(30.0)).await?;
//!
//! let region = SweepRegion::new(100.0, 120.0, 100.0, 120.0, 1.0)?;
//! let mut sweep = client.xy_sweep(region);
//! while let Some(point) = sweep.next().await {
//!     let (x, y) = point?;
//!     println!("At {x}, {y}");
//! }
//! # Ok(())
//! # }
//! ```
use crate::{
    command::{Command, DecodeError, MoveRequest, Position},
    config::ClientConfig,
    dispatch::{DispatchError, Dispatcher, RetryPolicy},
    rpc::{Connector, Endpoint, WebSocketConnector},
    sweep::{Sweep, SweepRegion},
};
use serde_json::Value;

/// Errors that can occur when running a client operation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("Unexpected response: {0}")]
    Decode(#[from] DecodeError),
}

/// A client for one Klipper printer.
///
/// The generic parameter `C` is the [`Connector`] used to open sessions.
#[derive(Debug, Clone)]
pub struct KlipperClient<C = WebSocketConnector> {
    dispatcher: Dispatcher<C>,
}

impl KlipperClient<WebSocketConnector> {
    /// A client for the Moonraker instance at `host`, on the default port.
    pub fn new(host: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(host))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        let connector = WebSocketConnector::new(config.connect_timeout, config.call_timeout);
        let policy = RetryPolicy::default().with_max_attempts(config.max_attempts);

        Self::with_connector(config.endpoint(), connector).with_retry_policy(policy)
    }
}

impl<C: Connector> KlipperClient<C> {
    /// A client opening its sessions through `connector`.
    pub fn with_connector(endpoint: Endpoint, connector: C) -> Self {
        Self {
            dispatcher: Dispatcher::new(connector, endpoint),
        }
    }

    pub fn with_retry_policy(self, policy: RetryPolicy) -> Self {
        Self {
            dispatcher: self.dispatcher.with_retry_policy(policy),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.dispatcher.endpoint()
    }

    /// Dispatches an arbitrary command and returns its raw result.
    pub async fn run_command(&self, command: &Command) -> Result<Value, ClientError> {
        Ok(self.dispatcher.dispatch(command).await?)
    }

    /// Runs a G-code script.
    pub async fn run_gcode(&self, script: impl Into<String>) -> Result<Value, ClientError> {
        self.run_command(&Command::gcode(script)).await
    }

    /// Homes the printer. It is recommended to home after an emergency stop.
    pub async fn home(&self) -> Result<(), ClientError> {
        self.run_command(&Command::home()).await.map(drop)
    }

    /// Transitions Klipper to its shutdown state, like `M112`.
    pub async fn emergency_stop(&self) -> Result<(), ClientError> {
        self.run_command(&Command::emergency_stop()).await.map(drop)
    }

    /// Moves to the requested coordinates using absolute positioning.
    pub async fn move_to(&self, request: MoveRequest) -> Result<(), ClientError> {
        self.run_command(&Command::move_to(request)).await.map(drop)
    }

    /// The internal G-code position, including any offsets added to an axis.
    pub async fn get_position(&self) -> Result<Position, ClientError> {
        let response = self.run_command(&Command::position_query()).await?;
        Ok(Position::from_query_response(&response)?)
    }

    /// The Moonraker server information. Not retried.
    pub async fn server_info(&self) -> Result<Value, ClientError> {
        Ok(self.dispatcher.server_info().await?)
    }

    /// Sweeps `region`, yielding each point once the head has reached it.
    ///
    /// See [`crate::sweep`] for the traversal order.
    pub fn xy_sweep(&self, region: SweepRegion) -> Sweep<'_> {
        Sweep::new(self, region)
    }
}
