//! # Motion Commands
//!
//! Builders that turn high-level printer operations into the Moonraker method name and
//! parameter payload that performs them, plus decoding of the position query result.
//!
//! The method names are the wire contract with Moonraker and must match exactly.
//!
//! ## Example
//!
//! ```rust
//! use klipperxyz_core::command::{Command, MoveRequest};
//!
//! let command = Command::move_to(MoveRequest::new().x(100.0).z(30.0));
//!
//! assert_eq!(command.method(), "printer.gcode.script");
//! assert_eq!(command.script(), Some("G90\nG1 X100.0 Z30.0 "));
//! ```
use crate::rpc::Params;
use serde_json::{Value, json};

/// Runs a G-code script.
pub const GCODE_SCRIPT: &str = "printer.gcode.script";
/// Puts Klipper in its shutdown state, like `M112`.
pub const EMERGENCY_STOP: &str = "printer.emergency_stop";
/// Queries the status of printer objects.
pub const OBJECTS_QUERY: &str = "printer.objects.query";
/// Moonraker server information.
pub const SERVER_INFO: &str = "server.info";

/// Klipper object that tracks the G-code position.
pub const MOTION_OBJECT: &str = "gcode_move";

const HOME_ALL_AXES: &str = "G28";
const ABSOLUTE_POSITIONING: &str = "G90";
const LINEAR_MOVE: &str = "G1";
const POSITION_POINTER: &str = "/status/gcode_move/gcode_position";

/// A remote method call: the method name and its named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    method: String,
    params: Option<Params>,
}

impl Command {
    /// A call to `method` with the given parameters.
    pub fn new(method: impl Into<String>, params: Option<Params>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    /// The `script` parameter, for G-code commands.
    pub fn script(&self) -> Option<&str> {
        self.params.as_ref()?.get("script")?.as_str()
    }

    /// Runs an arbitrary G-code script.
    pub fn gcode(script: impl Into<String>) -> Self {
        let mut params = Params::new();
        params.insert("script".to_string(), Value::String(script.into()));
        Self::new(GCODE_SCRIPT, Some(params))
    }

    /// Moves to the requested coordinates using absolute positioning.
    ///
    /// Only the axes set on `request` appear in the `G1` directive, each with one decimal.
    pub fn move_to(request: MoveRequest) -> Self {
        let mut script = format!("{ABSOLUTE_POSITIONING}\n{LINEAR_MOVE} ");

        for (axis, value) in [('X', request.x), ('Y', request.y), ('Z', request.z)] {
            if let Some(value) = value {
                script.push_str(&format!("{axis}{value:.1} "));
            }
        }

        tracing::debug!(script = %script.escape_debug(), "built move command");

        Self::gcode(script)
    }

    /// Homes all axes. Recommended after an emergency stop.
    pub fn home() -> Self {
        Self::gcode(HOME_ALL_AXES)
    }

    pub fn emergency_stop() -> Self {
        Self::new(EMERGENCY_STOP, None)
    }

    /// Queries the `gcode_move` object. Decode the result with [`Position::from_query_response`].
    pub fn position_query() -> Self {
        let params = json!({ "objects": { MOTION_OBJECT: null } });
        Self::new(OBJECTS_QUERY, params.as_object().cloned())
    }
}

/// Shorthand for [`Command::move_to`] with individual optional axes.
pub fn build_move(x: Option<f64>, y: Option<f64>, z: Option<f64>) -> Command {
    Command::move_to(MoveRequest { x, y, z })
}

/// Target coordinates of a move. Unset axes keep their current position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveRequest {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl MoveRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x(mut self, x: f64) -> Self {
        self.x = Some(x);
        self
    }

    pub fn y(mut self, y: f64) -> Self {
        self.y = Some(y);
        self
    }

    pub fn z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }
}

/// Errors that can occur when decoding a position query response.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecodeError {
    #[error("Response has no '{0}' member")]
    MissingField(&'static str),
    #[error("Position is not an array")]
    NotAnArray,
    #[error("Position has {0} elements, expected 4")]
    WrongLength(usize),
    #[error("Position element {0} is not a number")]
    NotANumber(usize),
}

/// The internal G-code position, including any offsets (`SET_GCODE_OFFSET`, `G92`, ...).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub e: f64,
}

impl Position {
    /// Extracts `status.gcode_move.gcode_position` from a `printer.objects.query` result.
    pub fn from_query_response(response: &Value) -> Result<Self, DecodeError> {
        let position = response
            .pointer(POSITION_POINTER)
            .ok_or(DecodeError::MissingField(POSITION_POINTER))?;

        let values = position.as_array().ok_or(DecodeError::NotAnArray)?;

        let [x, y, z, e] = values.as_slice() else {
            return Err(DecodeError::WrongLength(values.len()));
        };

        let number = |i: usize, v: &Value| v.as_f64().ok_or(DecodeError::NotANumber(i));

        Ok(Self {
            x: number(0, x)?,
            y: number(1, y)?,
            z: number(2, z)?,
            e: number(3, e)?,
        })
    }

    /// The position as an `(X, Y, Z, E)` tuple.
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.x, self.y, self.z, self.e)
    }
}
