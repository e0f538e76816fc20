//! # KlipperXYZ CLI Entry Point
//!
//! The main executable for the KlipperXYZ tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs
//!    the log subscriber.
//! 2. **Execution**: Builds a `KlipperClient` for the printer and runs the requested
//!    operation. Every operation opens and closes its own connection.
//! 3. **Presentation**: Formats and prints the resulting data or error to standard output/error.

mod cli;
mod formatter;

use clap::Parser;
use cli::{Cli, Commands};
use formatter::{Done, FormattedString, SweepPoint};
use futures_util::StreamExt;
use klipperxyz_core::{
    client::{ClientError, KlipperClient},
    command::MoveRequest,
    sweep::SweepRegion,
};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let client = KlipperClient::from_config(args.client_config());

    let result = match args.command {
        Commands::Home => client.home().await.map(|()| print(Done("Homed"))),
        Commands::Move { x, y, z } => client
            .move_to(MoveRequest { x, y, z })
            .await
            .map(|()| print(Done("Moved"))),
        Commands::Stop => client
            .emergency_stop()
            .await
            .map(|()| print(Done("Emergency stop sent"))),
        Commands::Position => client.get_position().await.map(print),
        Commands::Info => client.server_info().await.map(print),
        Commands::Gcode { script } => client.run_gcode(script).await.map(print),
        Commands::Sweep {
            x_start,
            x_end,
            y_start,
            y_end,
            step,
            x_step,
            y_step,
        } => {
            let region = match SweepRegion::with_steps(
                x_start,
                x_end,
                y_start,
                y_end,
                x_step.unwrap_or(step),
                y_step.unwrap_or(step),
            ) {
                Ok(region) => region,
                Err(err) => {
                    eprintln!("{}", FormattedString::from(err));
                    process::exit(2);
                }
            };
            run_sweep(&client, region).await
        }
    };

    if let Err(err) = result {
        eprintln!("{}", FormattedString::from(err));
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print(value: impl Into<FormattedString>) {
    println!("{}", value.into());
}

async fn run_sweep(client: &KlipperClient, region: SweepRegion) -> Result<(), ClientError> {
    tracing::info!(points = region.len(), "starting sweep");

    let mut sweep = client.xy_sweep(region);
    while let Some(point) = sweep.next().await {
        let (x, y) = point?;
        print(SweepPoint(x, y));
    }

    Ok(())
}
