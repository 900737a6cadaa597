//! Configuration module for the linkcash terminal.
//!
//! Handles loading configuration from a TOML file and applying CLI
//! overrides on top of it.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{BackendSettings, CheckoutSettings, PollPolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("no backend base URL configured (set [backend] base_url or pass --base-url)")]
    MissingBaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub backend: BackendSettings,
    pub polling: PollPolicy,
    pub checkout: CheckoutSettings,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    base_url_override: Option<Url>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, base_url_override: Option<Url>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            base_url_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, falling back to defaults when it does not exist
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let file_config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = ?self.config_path,
                    "Config file not found, using defaults"
                );
                FileConfig::default()
            }
            Err(e) => return Err(e.into()),
        };
        self.build(file_config)
    }

    fn build(&self, mut file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
        if let Some(base_url) = &self.base_url_override {
            file_config.backend.base_url = Some(base_url.clone());
        }

        self.validate(&file_config)?;

        let base_url = file_config
            .backend
            .base_url
            .ok_or(ConfigError::MissingBaseUrl)?;

        Ok(LoadedConfig {
            backend: BackendSettings {
                base_url,
                timeout: Duration::from_secs(file_config.backend.timeout_secs),
            },
            polling: PollPolicy {
                max_attempts: file_config.polling.max_attempts,
                interval: Duration::from_millis(file_config.polling.interval_ms),
                initial_delay: Duration::from_millis(file_config.polling.initial_delay_ms),
            },
            checkout: CheckoutSettings {
                publishable_key: file_config.checkout.publishable_key,
            },
        })
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.polling.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "polling.max_attempts must be at least 1".to_string(),
            ));
        }
        if config.backend.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "backend.timeout_secs must be at least 1".to_string(),
            ));
        }
        if let Some(url) = &config.backend.base_url
            && !matches!(url.scheme(), "http" | "https")
        {
            return Err(ConfigError::ValidationError(format!(
                "backend.base_url must use http or https, got {}",
                url.scheme()
            )));
        }
        Ok(())
    }
}
