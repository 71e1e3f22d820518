//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered with the `config`
//! crate, later sources overriding earlier ones:
//!
//! 1. Base file (`config/decision-core.toml` unless a path is given)
//! 2. Optional environment override `<dir>/environments/<env>.toml`
//! 3. `DECISION__*` environment variables (e.g. `DECISION__TTL_SECONDS=10`)
//!
//! The merged result is deserialized into [`DecisionServiceConfig`] and validated
//! before it is handed out.

use super::error::{ConfigResult, ConfigurationError};
use super::DecisionServiceConfig;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_CONFIG_FILE: &str = "config/decision-core.toml";
const ENV_PREFIX: &str = "DECISION";

/// Loaded and validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: DecisionServiceConfig,
    environment: String,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration from the default location with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_file(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from a specific file with environment auto-detection
    pub fn load_from_file(path: &Path) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_file_with_env(path, &environment)
    }

    /// Load configuration from a specific file with an explicit environment
    ///
    /// Useful for testing without modifying global environment variables.
    pub fn load_from_file_with_env(
        path: &Path,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        if !path.is_file() {
            return Err(ConfigurationError::ConfigFileNotFound {
                path: path.to_path_buf(),
            });
        }

        debug!(
            environment = %environment,
            path = %path.display(),
            "Loading decision service configuration"
        );

        let override_path = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("environments")
            .join(format!("{environment}.toml"));

        let config: DecisionServiceConfig = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()).required(true))
            .add_source(config::File::from(override_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;

        info!(
            environment = %environment,
            ttl_seconds = config.ttl_seconds,
            max_size = config.max_size,
            failure_threshold = config.failure_threshold,
            key_prefix = %config.key_prefix,
            "⚙️ Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_path: Some(path.to_path_buf()),
        }))
    }

    /// Wrap an in-memory configuration, validating it first
    pub fn from_config(config: DecisionServiceConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_path: None,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &DecisionServiceConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("DECISION_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }
}
