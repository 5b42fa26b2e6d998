//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\track-continuity\config.toml
//! - macOS: ~/Library/Application Support/track-continuity/config.toml
//! - Linux: ~/.config/track-continuity/config.toml
//!
//! Every section is optional; missing fields fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hot/cold pool settings
    pub pool: PoolConfig,

    /// Verification pipeline settings
    pub verification: VerificationConfig,

    /// Prefetch, estimator and buffer settings
    pub playback: PlaybackConfig,

    /// Periodic rescore/age-out settings
    pub maintenance: MaintenanceConfig,

    /// Backend service settings
    pub service: ServiceConfig,

    /// Snapshot storage settings
    pub storage: StorageConfig,
}

/// Track pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum tracks in active rotation
    pub hot_capacity: usize,
    /// Maximum aged-out tracks retained for recovery
    pub cold_capacity: usize,
    /// Score new and recovered tracks start at
    pub default_score: f64,
    /// Stale tracks below this score age out
    pub low_score_cutoff: f64,
    /// Days without activity before a track counts as stale
    pub age_out_days: u32,
    /// Max results per artist in discovery selections
    pub artist_cap: usize,
    /// Upper bound of the random jitter added to discovery rankings
    pub discovery_jitter: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            hot_capacity: 100,
            cold_capacity: 500,
            default_score: 50.0,
            low_score_cutoff: 30.0,
            age_out_days: 14,
            artist_cap: 2,
            discovery_jitter: 5.0,
        }
    }
}

/// Verification pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Thumbnail probe timeout in seconds
    pub thumbnail_timeout_secs: u64,
    /// How long a successful resolution is trusted (hours)
    pub success_ttl_hours: i64,
    /// How long a failed resolution is remembered (hours)
    pub failure_ttl_hours: i64,
    /// How long a permanent failure blocks an id (days)
    pub permanent_failure_ttl_days: i64,
    /// Failed repair attempts per query before suppression
    pub max_repair_attempts: u32,
    /// Window after which a query's attempt counter resets (minutes)
    pub retry_cooldown_mins: i64,
    /// Search results considered during repair
    pub search_limit: usize,
    /// Minimum normalized similarity for a fuzzy content match (0.0-1.0)
    pub min_similarity: f32,
    /// Delay between tracks during a batch heal (milliseconds)
    pub heal_delay_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            thumbnail_timeout_secs: 5,
            success_ttl_hours: 6,
            failure_ttl_hours: 24,
            permanent_failure_ttl_days: 7,
            max_repair_attempts: 3,
            retry_cooldown_mins: 10,
            search_limit: 5,
            min_similarity: 0.8,
            heal_delay_ms: 250,
        }
    }
}

impl VerificationConfig {
    pub fn thumbnail_timeout(&self) -> Duration {
        Duration::from_secs(self.thumbnail_timeout_secs)
    }

    pub fn heal_delay(&self) -> Duration {
        Duration::from_millis(self.heal_delay_ms)
    }

    pub fn success_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.success_ttl_hours)
    }

    pub fn failure_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.failure_ttl_hours)
    }

    pub fn permanent_failure_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.permanent_failure_ttl_days)
    }

    pub fn retry_cooldown(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.retry_cooldown_mins)
    }
}

/// Prefetch, estimator and buffer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Maximum prefetched tracks held in memory
    pub prefetch_capacity: usize,
    /// Measurements kept by the estimator
    pub estimator_max_samples: usize,
    /// Trailing window for measurements (seconds)
    pub estimator_window_secs: u64,
    /// Estimate reported before any measurement (kbps)
    pub initial_estimate_kbps: f64,
    /// Minimum throughput for the high tier (kbps)
    pub high_tier_kbps: f64,
    /// Minimum throughput for the medium tier (kbps)
    pub medium_tier_kbps: f64,
    /// Hysteresis band around tier thresholds (kbps, 0 = off)
    pub hysteresis_kbps: f64,
    /// Buffered-ahead seconds below which playback is in danger
    pub emergency_buffer_secs: f64,
    /// Buffered-ahead seconds below which quality should drop
    pub warning_buffer_secs: f64,
    /// Buffered-ahead seconds considered full
    pub target_buffer_secs: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            prefetch_capacity: 5,
            estimator_max_samples: 10,
            estimator_window_secs: 30,
            initial_estimate_kbps: 500.0,
            high_tier_kbps: 1000.0,
            medium_tier_kbps: 400.0,
            hysteresis_kbps: 0.0,
            emergency_buffer_secs: 3.0,
            warning_buffer_secs: 8.0,
            target_buffer_secs: 30.0,
        }
    }
}

/// Maintenance worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Whether the periodic pass runs at all
    pub enabled: bool,
    /// Seconds between passes
    pub interval_secs: u64,
    /// Save a snapshot after each pass
    pub checkpoint: bool,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            checkpoint: true,
        }
    }
}

impl MaintenanceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Backend service settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Backend base URL (empty = built-in default)
    pub base_url: Option<String>,
}

/// Snapshot storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Snapshot file (empty = data directory default)
    pub snapshot_path: Option<PathBuf>,
}

impl StorageConfig {
    /// The configured snapshot path, or the platform default.
    pub fn resolved_snapshot_path(&self) -> Option<PathBuf> {
        self.snapshot_path
            .clone()
            .or_else(|| data_dir().map(|d| d.join("pool.json")))
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("track-continuity"))
}

/// Get the data directory path (snapshots)
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("track-continuity"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from a specific file, falling back to defaults.
pub fn load_from(path: &std::path::Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Save configuration to a specific file
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &std::path::Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[pool]"));
        assert!(toml.contains("[verification]"));
        assert!(toml.contains("[playback]"));
        assert!(toml.contains("[maintenance]"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[pool]
hot_capacity = 20

[playback]
hysteresis_kbps = 50.0
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.pool.hot_capacity, 20);
        assert_eq!(config.playback.hysteresis_kbps, 50.0);

        // Other fields use defaults
        assert_eq!(config.pool.cold_capacity, 500);
        assert_eq!(config.pool.low_score_cutoff, 30.0);
        assert_eq!(config.verification.max_repair_attempts, 3);
        assert_eq!(config.verification.thumbnail_timeout(), Duration::from_secs(5));
        assert_eq!(config.maintenance.interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.service.base_url = Some("http://localhost:8080".to_string());
        config.verification.success_ttl_hours = 1;

        save_to(&config, &path).unwrap();
        let loaded = load_from(&path);

        assert_eq!(loaded.service.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(loaded.verification.success_ttl_hours, 1);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "pool = [not valid").unwrap();

        let config = load_from(&path);
        assert_eq!(config.pool.hot_capacity, 100);
    }
}
