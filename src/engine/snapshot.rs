//! Persisted engine state.
//!
//! Scores are not stored; the engine rescores after loading. Verification
//! records and retry counters are short-lived and also left out.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ResultExt};
use crate::health::PermanentFailureRecord;
use crate::pool::{PooledTrack, Preferences};

/// Current snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub hot: Vec<PooledTrack>,
    pub cold: Vec<PooledTrack>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub permanent_failures: Vec<PermanentFailureRecord>,
}

impl EngineSnapshot {
    /// Write as pretty JSON via temp file + rename.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(format!("creating {}", dir.display()))?;
        }

        let contents = serde_json::to_string_pretty(self).with_context("serializing snapshot")?;
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, contents)
            .with_context(format!("writing {}", temp_path.display()))?;
        std::fs::rename(&temp_path, path).with_context(format!(
            "renaming {} to {}",
            temp_path.display(),
            path.display()
        ))?;
        Ok(())
    }

    /// Read a snapshot; `Ok(None)` if the file doesn't exist.
    pub fn read_from(path: &Path) -> Result<Option<Self>> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e).context(format!("reading {}", path.display()))),
        };

        let snapshot: Self = serde_json::from_str(&contents)
            .with_context(format!("parsing {}", path.display()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::snapshot(
                path,
                format!("unsupported version {}", snapshot.version),
            ));
        }
        Ok(Some(snapshot))
    }
}
