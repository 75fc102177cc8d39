//! Run configuration.
//!
//! Defaults come from the `default_*` functions below, a YAML file may override
//! them, and the CLI overrides both.

use crate::error::IngestError;
use crate::languages::LanguageTable;
use crate::pos::PosTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pages per sink batch (one transaction each)
fn default_batch_size() -> usize {
    100
}

fn default_progress_interval_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seconds between progress reports
    #[serde(default = "default_progress_interval_secs")]
    pub progress_interval_secs: u64,

    /// Page records to read past before parsing starts (resume after a fatal error)
    #[serde(default)]
    pub skip_pages: usize,

    /// Stop after this many page records
    #[serde(default)]
    pub page_limit: Option<usize>,

    #[serde(default)]
    pub languages_path: Option<PathBuf>,

    #[serde(default)]
    pub pos_path: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            progress_interval_secs: default_progress_interval_secs(),
            skip_pages: 0,
            page_limit: None,
            languages_path: None,
            pos_path: None,
            log_level: default_log_level(),
        }
    }
}

impl IngestConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, IngestError> {
        let config: IngestConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_path(path: &Path) -> Result<Self, IngestError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Check every field and report all problems together.
    pub fn validate(&self) -> Result<(), IngestError> {
        let mut errors: Vec<String> = Vec::new();

        if self.batch_size == 0 {
            errors.push("batch_size must be positive".to_string());
        }
        if self.progress_interval_secs == 0 {
            errors.push("progress_interval_secs must be positive".to_string());
        }
        if self.page_limit == Some(0) {
            errors.push("page_limit must be positive when set".to_string());
        }
        if self.log_level.trim().is_empty() {
            errors.push("log_level must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(IngestError::Config(errors.join("; ")))
        }
    }

    /// The configured language table, or the built-in one.
    pub fn language_table(&self) -> Result<LanguageTable, IngestError> {
        match &self.languages_path {
            Some(path) => LanguageTable::from_yaml_path(path),
            None => Ok(LanguageTable::default()),
        }
    }

    pub fn pos_table(&self) -> Result<PosTable, IngestError> {
        match &self.pos_path {
            Some(path) => PosTable::from_yaml_path(path),
            None => Ok(PosTable::default()),
        }
    }
}
