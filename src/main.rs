//! Track Continuity - keeps a listening session supplied with playable tracks.
//!
//! A scored hot/cold track pool, adaptive prefetch and buffering, and a
//! self-healing verification pipeline, driven from the command line.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod playback;
pub mod pool;
#[cfg(test)]
pub mod test_utils;

use clap::{CommandFactory, Parser};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Component log targets used across the engine.
const LOG_TARGETS: [&str; 7] = [
    "catalog",
    "heal",
    "maintenance",
    "network",
    "pool",
    "prefetch",
    "verify",
];

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    let mut filter = EnvFilter::from_default_env().add_directive("track_continuity=info".parse()?);
    for target in LOG_TARGETS {
        filter = filter.add_directive(format!("{}=info", target).parse()?);
    }
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    if !cli::run_command(&args)? {
        cli::Cli::command().print_help()?;
        println!();
    }
    Ok(())
}
