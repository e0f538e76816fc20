//! # CLI
//!
//! This module defines the command-line interface of `klipperxyz` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g., ensuring a
//! G-code script is not empty).
use clap::{Parser, Subcommand};
use klipperxyz_core::{
    config::ClientConfig,
    dispatch::MAX_ATTEMPTS,
    rpc::{DEFAULT_PORT, websocket::DEFAULT_CALL_TIMEOUT_SECS},
    sweep::DEFAULT_STEP,
};
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "klipperxyz",
    version,
    about = "Control a Klipper 3D printer through Moonraker"
)]
pub struct Cli {
    /// Hostname or IP address of the printer (e.g. mainsailos.local)
    pub host: String,

    /// Moonraker API port
    #[arg(short, long, global = true, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Attempts per command before giving up
    #[arg(
        long,
        global = true,
        default_value_t = MAX_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub attempts: u32,

    /// Seconds to wait for each reply
    #[arg(long, global = true, default_value_t = DEFAULT_CALL_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Log every session and command
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.host.clone());
        config.port = self.port;
        config.max_attempts = self.attempts;
        config.call_timeout = Duration::from_secs(self.timeout);
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Home all axes
    ///
    /// It is recommended to home after an emergency stop.
    Home,

    /// Move to absolute coordinates
    ///
    /// Axes that are not given keep their position.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// klipperxyz mainsailos.local move --x 100 --y 100 --z 30
    /// ```
    Move {
        #[arg(long)]
        x: Option<f64>,
        #[arg(long)]
        y: Option<f64>,
        #[arg(long)]
        z: Option<f64>,
    },

    /// Shut Klipper down immediately (like M112)
    Stop,

    /// Print the G-code position [X, Y, Z, E], including offsets
    Position,

    /// Print the Moonraker server information
    Info,

    /// Run a raw G-code script
    Gcode {
        #[arg(value_parser = parse_script)]
        script: String,
    },

    /// Sweep the XY plane, printing each point once reached
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// klipperxyz mainsailos.local sweep 100 120 100 120 --step 0.5
    /// ```
    Sweep {
        #[arg(allow_negative_numbers = true)]
        x_start: f64,
        #[arg(allow_negative_numbers = true)]
        x_end: f64,
        #[arg(allow_negative_numbers = true)]
        y_start: f64,
        #[arg(allow_negative_numbers = true)]
        y_end: f64,
        /// Distance between points on both axes
        #[arg(long, default_value_t = DEFAULT_STEP)]
        step: f64,
        /// Distance between points in X, overrides --step
        #[arg(long)]
        x_step: Option<f64>,
        /// Distance between points in Y, overrides --step
        #[arg(long)]
        y_step: Option<f64>,
    },
}

fn parse_script(value: &str) -> Result<String, String> {
    // Allow `\n` escapes so multi-line scripts fit on one command line
    let script = value.replace("\\n", "\n");

    if script.trim().is_empty() {
        return Err("G-code script cannot be empty".to_string());
    }

    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move() {
        let cli = Cli::try_parse_from([
            "klipperxyz",
            "printer.local",
            "move",
            "--x",
            "10",
            "--z",
            "2.5",
        ])
        .unwrap();

        match cli.command {
            Commands::Move { x, y, z } => {
                assert_eq!(x, Some(10.0));
                assert_eq!(y, None);
                assert_eq!(z, Some(2.5));
            }
            _ => panic!("Expected move"),
        }
    }

    #[test]
    fn test_defaults_map_to_config() {
        let cli = Cli::try_parse_from(["klipperxyz", "printer.local", "home"]).unwrap();
        let config = cli.client_config();

        assert_eq!(config, ClientConfig::new("printer.local"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "klipperxyz",
            "printer.local",
            "position",
            "--port",
            "7126",
            "--attempts",
            "2",
        ])
        .unwrap();
        let config = cli.client_config();

        assert_eq!(config.port, 7126);
        assert_eq!(config.max_attempts, 2);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let args = ["klipperxyz", "printer.local", "--attempts", "0", "home"];

        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_sweep_with_negative_bounds() {
        let cli = Cli::try_parse_from([
            "klipperxyz",
            "printer.local",
            "sweep",
            "-5",
            "5",
            "0",
            "10",
            "--y-step",
            "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Sweep {
                x_start,
                x_end,
                step,
                x_step,
                y_step,
                ..
            } => {
                assert_eq!((x_start, x_end), (-5.0, 5.0));
                assert_eq!(step, DEFAULT_STEP);
                assert_eq!(x_step, None);
                assert_eq!(y_step, Some(2.0));
            }
            _ => panic!("Expected sweep"),
        }
    }

    #[test]
    fn test_parse_script() {
        assert_eq!(parse_script("G91\\nG1 Z5").unwrap(), "G91\nG1 Z5");
        assert!(parse_script("  ").is_err());
    }
}
