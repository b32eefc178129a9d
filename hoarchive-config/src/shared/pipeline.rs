use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Default vocabulary of tokens treated as NULL when loading CSV sources.
///
/// Matching is case-sensitive: `NA` is a null token, `na` is a player with an
/// unusual name.
pub const DEFAULT_NULL_TOKENS: &[&str] = &["", "NA", "null"];

fn default_null_tokens() -> Vec<String> {
    DEFAULT_NULL_TOKENS.iter().map(|s| s.to_string()).collect()
}

fn default_csv_dir() -> PathBuf {
    PathBuf::from("csv")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_max_load_workers() -> u16 {
    4
}

fn default_schema_version() -> u32 {
    1
}

/// Configuration for an ingestion pipeline run.
///
/// Contains all settings required to stage raw CSV sources and promote them
/// into curated tables: file locations, null handling, and parallelism limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory containing the raw CSV source files.
    #[serde(default = "default_csv_dir")]
    pub csv_dir: PathBuf,
    /// Directory holding pipeline state (ingestion manifest, run logs).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Tokens that are coerced to NULL during staging, compared case-sensitively.
    #[serde(default = "default_null_tokens")]
    pub null_tokens: Vec<String>,
    /// Maximum number of source files staged in parallel.
    #[serde(default = "default_max_load_workers")]
    pub max_load_workers: u16,
    /// Version of the curated schema recorded in the ingestion manifest.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

impl PipelineConfig {
    /// Validates pipeline configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_load_workers == 0 {
            return Err(ValidationError::MaxLoadWorkersZero);
        }

        if self.null_tokens.is_empty() {
            return Err(ValidationError::EmptyNullTokens);
        }

        if self.schema_version == 0 {
            return Err(ValidationError::SchemaVersionZero);
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            csv_dir: default_csv_dir(),
            data_dir: default_data_dir(),
            null_tokens: default_null_tokens(),
            max_load_workers: default_max_load_workers(),
            schema_version: default_schema_version(),
        }
    }
}
