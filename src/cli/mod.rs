//! Command-line interface for the track continuity engine.
//!
//! Commands verify and heal track references, feed the pool from search or
//! curator files, inspect selections and statistics, and run maintenance.

mod commands;

pub use commands::{Cli, Commands, run_command};
