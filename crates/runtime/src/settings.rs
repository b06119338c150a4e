//! Layered application configuration
//!
//! Built-in defaults, then an optional TOML file, then `HANDSIGN__*`
//! environment variables (`HANDSIGN__SESSION__WINDOW_MS=2000`).
//! Command-line flags are applied last by [`crate::cli::Args::apply`].

use anyhow::{Context, Result};
use camera_capture::CameraConfig;
use config::{Config, Environment, File, FileFormat};
use gesture::{ModelConfig, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "HANDSIGN";

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Where emitted commands go
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// One JSON object per command instead of the bare label
    pub json: bool,
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub session: SessionConfig,
    pub models: ModelConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
    /// Annotation script replacing the models, for offline replay
    pub annotations: Option<PathBuf>,
}

impl AppConfig {
    /// Load defaults, `path` (if given) and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            env.prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .with_context(|| match path {
                Some(p) => format!("Failed to load configuration from {}", p.display()),
                None => "Failed to load configuration".to_string(),
            })?;
        Ok(config)
    }
}
