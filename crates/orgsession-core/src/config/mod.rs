//! Runtime configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field has a default so an empty file is valid.

pub mod coordination;
pub mod logging;
pub mod pipeline;
pub mod storage;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::coordination::CoordinationConfig;
pub use self::logging::LoggingConfig;
pub use self::pipeline::PipelineConfig;
pub use self::storage::{FileStorageConfig, RedisStorageConfig, StorageConfig};

use crate::error::AppError;

/// Root runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// Durable session storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Parent wait and staleness settings.
    #[serde(default)]
    #[validate(nested)]
    pub coordination: CoordinationConfig,
    /// Request pipeline defaults.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// The file is optional. Environment variables prefixed with
    /// `ORGSESSION__` override file values, e.g.
    /// `ORGSESSION__COORDINATION__POLL_INTERVAL_MS=50`.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("ORGSESSION")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        loaded.validate()?;
        Ok(loaded)
    }
}
