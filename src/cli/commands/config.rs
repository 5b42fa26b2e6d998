//! Config command: show the effective config or write defaults.

use std::path::Path;

use anyhow::Context;

use crate::config::{self, Config};

/// Show the config file, or write defaults with `--init`
pub fn cmd_config(path: Option<&Path>, init: bool) -> anyhow::Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config::config_path().context("Could not determine config directory")?,
    };

    if init {
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            config::save_to(&Config::default(), &path)?;
            println!("Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    let config = config::load_from(&path);
    let contents = toml::to_string_pretty(&config).context("Failed to serialize config")?;

    if path.exists() {
        println!("# {}", path.display());
    } else {
        println!("# {} (not found, showing defaults)", path.display());
    }
    println!("{}", contents);
    Ok(())
}
