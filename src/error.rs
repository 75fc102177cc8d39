//! Error taxonomy for an ingestion run.
//!
//! Only `MalformedStream` aborts a run. Skipped pages and structural
//! ambiguities are not errors at all: the coordinator counts them and the
//! parser absorbs them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The dump is not well-formed XML; nothing past `offset` can be trusted.
    #[error("malformed stream at byte {offset} after {pages} pages: {message}")]
    MalformedStream {
        offset: u64,
        pages: usize,
        message: String,
    },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl IngestError {
    /// Whether the coordinator must stop the run instead of skipping a page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IngestError::MalformedStream { .. })
    }

    /// Page count reached before a fatal stream error, for `--skip-pages` restarts.
    pub fn pages_reached(&self) -> Option<usize> {
        match self {
            IngestError::MalformedStream { pages, .. } => Some(*pages),
            _ => None,
        }
    }
}
