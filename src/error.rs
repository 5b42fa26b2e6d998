//! Application-wide error types.
//!
//! Subsystems keep their own `thiserror` enums ([`ServiceError`],
//! [`ConfigError`]); this module aggregates them for engine operations that
//! touch disk. The CLI uses `anyhow` on top.
//!
//! # Design
//!
//! - [`Error`]: Top-level error enum
//! - [`ResultExt`]: attach a context string to any supported result
//!
//! # Example
//!
//! ```ignore
//! use track_continuity::error::{Result, ResultExt};
//!
//! fn read_snapshot(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path).with_context(format!("reading {}", path.display()))
//! }
//! ```

use std::path::PathBuf;

use crate::catalog::ServiceError;
use crate::config::ConfigError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend service error
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Snapshot missing or unusable
    #[error("Snapshot error for {path}: {message}")]
    Snapshot { path: PathBuf, message: String },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn snapshot(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Snapshot {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, serde_json::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Json(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_error_display() {
        let err = Error::snapshot("/data/pool.json", "unsupported version 9");
        let msg = err.to_string();
        assert!(msg.contains("pool.json"));
        assert!(msg.contains("unsupported version 9"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::Service(ServiceError::Timeout).context("while ingesting");
        let msg = err.to_string();
        assert!(msg.contains("while ingesting"));
        assert!(msg.contains("timed out"));
    }

    #[test]
    fn test_io_result_ext() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = result.with_context("reading snapshot").unwrap_err();
        assert!(matches!(err, Error::WithContext { .. }));
        assert!(err.to_string().starts_with("reading snapshot"));
    }

    #[test]
    fn test_json_result_ext() {
        let result = serde_json::from_str::<u32>("not json").with_context("parsing");
        assert!(result.unwrap_err().to_string().contains("parsing"));
    }
}
