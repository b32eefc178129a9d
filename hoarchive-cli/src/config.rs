use hoarchive_config::shared::PipelineConfig;
use hoarchive_config::{Config, LoadConfigError, load_config};
use serde::Deserialize;
use tracing::debug;

/// Top-level configuration of the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config for AppConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["pipeline.null_tokens"];
}

/// Loads configuration, falling back to defaults when no `configuration/` directory
/// exists next to the process. Every other load failure is fatal.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    match load_config::<AppConfig>() {
        Ok(config) => Ok(config),
        Err(LoadConfigError::MissingConfigurationDirectory(directory)) => {
            debug!(
                directory = %directory.display(),
                "no configuration directory, using defaults"
            );
            Ok(AppConfig {
                pipeline: PipelineConfig::default(),
            })
        }
        Err(err) => Err(err.into()),
    }
}
