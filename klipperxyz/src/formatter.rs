use colored::*;
use klipperxyz_core::{
    client::ClientError, command::Position, rpc::CallError, session::SessionError,
    sweep::InvalidRegion,
};

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

/// A sweep point that has just been reached.
pub struct SweepPoint(pub f64, pub f64);

/// Acknowledgement of a command that returns nothing interesting.
pub struct Done(pub &'static str);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.0)
    }
}

impl From<serde_json::Value> for FormattedString {
    fn from(value: serde_json::Value) -> Self {
        let pretty = serde_json::to_string_pretty(&value);
        FormattedString(pretty.unwrap_or_else(|_| value.to_string()))
    }
}

impl From<Position> for FormattedString {
    fn from(position: Position) -> Self {
        FormattedString(format!(
            "{} X={:.3} Y={:.3} Z={:.3} E={:.3}",
            "Position:".cyan().bold(),
            position.x,
            position.y,
            position.z,
            position.e
        ))
    }
}

impl From<SweepPoint> for FormattedString {
    fn from(SweepPoint(x, y): SweepPoint) -> Self {
        FormattedString(format!("{} {:.3}, {:.3}", "At".green(), x, y))
    }
}

impl From<Done> for FormattedString {
    fn from(Done(what): Done) -> Self {
        FormattedString(format!("{} {}", "✓".green().bold(), what))
    }
}

impl From<ClientError> for FormattedString {
    fn from(err: ClientError) -> Self {
        let title = match &err {
            ClientError::Dispatch(dispatch) => match dispatch.session_error() {
                SessionError::Connect(_) => "Connection Failed:",
                SessionError::Call(CallError::Rpc { .. }) => "Command Rejected:",
                SessionError::Call(_) => "Command Failed:",
            },
            ClientError::Decode(_) => "Unexpected Response:",
        };
        FormattedString(format!("{}\n\n'{}'", title.red().bold(), err))
    }
}

impl From<InvalidRegion> for FormattedString {
    fn from(err: InvalidRegion) -> Self {
        let title = "Invalid Sweep Region:".red().bold();
        FormattedString(format!("{}\n\n'{}'", title, err))
    }
}
