// src/config/loader.rs
//! Configuration loader layering a TOML file with environment overrides

use crate::config::{constants::paths, SensorConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// Explicit config path does not exist
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML could not be parsed into a configuration
    #[error("Configuration parse error: {0}")]
    ParseError(String),

    /// Every problem `SensorConfig::validate` found
    #[error("Configuration validation errors: {}", .0.join("; "))]
    ValidationError(Vec<String>),

    /// Reading the file failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// File or environment layering failed
    #[error("Configuration source error: {0}")]
    Source(#[from] config::ConfigError),
}

impl From<toml::de::Error> for LoadError {
    fn from(err: toml::de::Error) -> Self {
        LoadError::ParseError(err.to_string())
    }
}

/// Loads [`SensorConfig`] from an optional file plus `DROP_SENSE__*` variables
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    use_environment: bool,
}

impl ConfigLoader {
    /// Loader that looks for `drop_sense.toml` in the working directory
    pub fn new() -> Self {
        Self {
            config_path: None,
            use_environment: true,
        }
    }

    /// Loader for an explicit file, which must exist
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
            use_environment: true,
        }
    }

    /// Ignore environment overrides
    pub fn without_environment(mut self) -> Self {
        self.use_environment = false;
        self
    }

    /// Build, deserialize and validate the configuration
    pub fn load(&self) -> Result<SensorConfig, LoadError> {
        let mut builder = config::Config::builder();

        match &self.config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(LoadError::FileNotFound(path.display().to_string()));
                }
                debug!(path = %path.display(), "Loading sensor configuration file");
                builder = builder.add_source(config::File::from(path.as_path()).required(true));
            }
            None => {
                builder = builder.add_source(
                    config::File::with_name(paths::DEFAULT_CONFIG_FILE).required(false),
                );
            }
        }

        if self.use_environment {
            builder = builder.add_source(
                config::Environment::with_prefix(paths::ENV_PREFIX)
                    .prefix_separator(paths::ENV_SEPARATOR)
                    .separator(paths::ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }

        let config: SensorConfig = builder.build()?.try_deserialize()?;
        config.validate().map_err(LoadError::ValidationError)?;

        info!(sensors = config.sensors.len(), "Sensor configuration loaded");
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<SensorConfig, LoadError> {
        let config: SensorConfig = toml::from_str(content)?;
        config.validate().map_err(LoadError::ValidationError)?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file without environment layering
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SensorConfig, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
