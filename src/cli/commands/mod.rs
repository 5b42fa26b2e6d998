//! CLI command definitions and dispatch.
//!
//! Each group of subcommands lives in its own submodule:
//! - `pool`: ingest, search, select, stats, maintain, run
//! - `verify`: verify and heal
//! - `config`: show or initialize the config file
//!
//! Commands that touch the pool load the snapshot first and save it back
//! when they change something.

mod config;
mod pool;
mod verify;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;

use crate::catalog::CatalogClient;
use crate::engine::Engine;

pub use config::cmd_config;
pub use pool::{cmd_ingest, cmd_maintain, cmd_run, cmd_search, cmd_select, cmd_stats};
pub use verify::{cmd_heal, cmd_verify};

/// Track Continuity CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to the OS config directory)
    #[arg(long, global = true, env = "TRACK_CONTINUITY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pool snapshot file (overrides the config)
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Backend base URL (overrides the config)
    #[arg(long, global = true, env = "TRACK_CONTINUITY_BASE_URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Verify (and repair) a single artist/title
    Verify {
        artist: String,
        title: String,
        /// Media id to check before falling back to search
        #[arg(long)]
        media_id: Option<String>,
        /// Thumbnail URL for the media id
        #[arg(long)]
        thumbnail: Option<String>,
    },
    /// Admit curator suggestions from a JSON file
    Ingest {
        /// Suggestions file: `[{title, artist}]` or `{"suggestions": [...]}`
        path: PathBuf,
        /// Maximum suggestions to process
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Search the catalog, optionally admitting the results
    Search {
        query: String,
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Verify and admit every hit
        #[arg(long)]
        admit: bool,
    },
    /// Check every pooled track and repair broken references
    Heal,
    /// Show pool, prefetch and network statistics
    Stats,
    /// Show ranked picks from the hot pool
    Select {
        /// Only this category (e.g. afrobeats, amapiano, gospel)
        #[arg(long)]
        category: Option<String>,
        /// Discovery picks to follow this track id
        #[arg(long, conflicts_with = "category")]
        after: Option<String>,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Run one maintenance pass (rescore + age out)
    Maintain,
    /// Run the maintenance worker until Ctrl-C
    Run,
    /// Show the config file, or write defaults with --init
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Run the specified CLI command.
///
/// Returns `Ok(true)` if a command was run, `Ok(false)` if no command was
/// specified (the caller prints help).
pub fn run_command(cli: &Cli) -> anyhow::Result<bool> {
    let Some(command) = &cli.command else {
        return Ok(false);
    };

    if let Commands::Config { init } = command {
        cmd_config(cli.config.as_deref(), *init)?;
        return Ok(true);
    }

    let rt = Runtime::new()?;
    let session = Session::open(cli)?;

    match command {
        Commands::Verify {
            artist,
            title,
            media_id,
            thumbnail,
        } => cmd_verify(&rt, &session, artist, title, media_id.as_deref(), thumbnail.as_deref())?,
        Commands::Ingest { path, limit } => cmd_ingest(&rt, &session, path, *limit)?,
        Commands::Search {
            query,
            limit,
            admit,
        } => cmd_search(&rt, &session, query, *limit, *admit)?,
        Commands::Heal => cmd_heal(&rt, &session)?,
        Commands::Stats => cmd_stats(&session)?,
        Commands::Select {
            category,
            after,
            limit,
        } => cmd_select(&session, category.as_deref(), after.as_deref(), *limit)?,
        Commands::Maintain => cmd_maintain(&session)?,
        Commands::Run => cmd_run(&rt, &session)?,
        Commands::Config { .. } => {}
    }
    Ok(true)
}

// ============================================================================
// Shared helpers
// ============================================================================

/// A loaded engine plus where to save it.
pub(crate) struct Session {
    pub engine: Arc<Engine>,
    pub catalog: Arc<CatalogClient>,
    pub snapshot: Option<PathBuf>,
}

impl Session {
    fn open(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => crate::config::load_from(path),
            None => crate::config::load(),
        };
        if let Some(url) = &cli.base_url {
            config.service.base_url = Some(url.clone());
        }

        let snapshot = cli
            .snapshot
            .clone()
            .or_else(|| config.storage.resolved_snapshot_path());
        let catalog = Arc::new(match &config.service.base_url {
            Some(url) => CatalogClient::with_base_url(url.clone()),
            None => CatalogClient::new(),
        });
        let engine = Arc::new(Engine::new(config, catalog.clone()));

        if let Some(path) = &snapshot {
            engine
                .load(path)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
        }
        Ok(Self {
            engine,
            catalog,
            snapshot,
        })
    }

    /// Save the engine if a snapshot path is known.
    pub fn save(&self) -> anyhow::Result<()> {
        match &self.snapshot {
            Some(path) => self
                .engine
                .save(path)
                .with_context(|| format!("Failed to save snapshot {}", path.display())),
            None => {
                eprintln!("No snapshot location; changes were not saved.");
                Ok(())
            }
        }
    }
}

/// Truncate a string for table output.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select() {
        let cli = Cli::parse_from(["track-continuity", "select", "--category", "gospel", "-l", "5"]);
        match cli.command {
            Some(Commands::Select {
                category, limit, ..
            }) => {
                assert_eq!(category.as_deref(), Some("gospel"));
                assert_eq!(limit, 5);
            }
            _ => panic!("expected select"),
        }
    }

    #[test]
    fn test_select_flags_conflict() {
        let result = Cli::try_parse_from([
            "track-continuity",
            "select",
            "--category",
            "gospel",
            "--after",
            "abc",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_snapshot_flag() {
        let cli = Cli::parse_from(["track-continuity", "stats", "--snapshot", "/tmp/pool.json"]);
        assert_eq!(cli.snapshot, Some(PathBuf::from("/tmp/pool.json")));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long title", 6), "a ver…");
    }
}
