//! File-backed curator.
//!
//! Reads curator suggestions from a JSON file: either an array of
//! `{title, artist}` objects or `{"suggestions": [...]}`. Used by the CLI to
//! feed externally generated suggestions through verification.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use super::domain::{ServiceError, Suggestion};
use super::traits::Curator;

#[derive(Deserialize)]
#[serde(untagged)]
enum SuggestionFile {
    List(Vec<Suggestion>),
    Wrapped { suggestions: Vec<Suggestion> },
}

/// Curator that reads suggestions from a JSON file on each call.
pub struct FileCurator {
    path: PathBuf,
}

impl FileCurator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse suggestion JSON, dropping entries with a blank title or artist.
pub fn parse_suggestions(json: &str) -> Result<Vec<Suggestion>, ServiceError> {
    let file: SuggestionFile =
        serde_json::from_str(json).map_err(|e| ServiceError::Parse(e.to_string()))?;
    let list = match file {
        SuggestionFile::List(list) => list,
        SuggestionFile::Wrapped { suggestions } => suggestions,
    };
    Ok(list
        .into_iter()
        .filter(|s| !s.title.trim().is_empty() && !s.artist.trim().is_empty())
        .collect())
}

#[async_trait]
impl Curator for FileCurator {
    async fn suggest(&self, limit: usize) -> Result<Vec<Suggestion>, ServiceError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ServiceError::Network(format!("{}: {}", self.path.display(), e)))?;
        let mut suggestions = parse_suggestions(&contents)?;
        suggestions.truncate(limit);
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_list() {
        let json = r#"[{"title":"Essence","artist":"Wizkid"},{"title":"","artist":"Nobody"}]"#;
        let suggestions = parse_suggestions(json).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].artist, "Wizkid");
    }

    #[test]
    fn test_parse_wrapped() {
        let json = r#"{"suggestions":[{"title":"Last Last","artist":"Burna Boy"}]}"#;
        assert_eq!(parse_suggestions(json).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(matches!(parse_suggestions("nope"), Err(ServiceError::Parse(_))));
    }

    #[tokio::test]
    async fn test_file_curator_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suggestions.json");
        std::fs::write(
            &path,
            r#"[{"title":"A","artist":"X"},{"title":"B","artist":"Y"},{"title":"C","artist":"Z"}]"#,
        )
        .unwrap();

        let curator = FileCurator::new(&path);
        let suggestions = curator.suggest(2).await.unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[1].title, "B");
    }
}
