//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod auth;
pub mod database;
pub mod logging;
pub mod media;
pub mod realtime;
pub mod store;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::auth::AuthConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::media::MediaConfig;
pub use self::realtime::RealtimeConfig;
pub use self::store::{StoreConfig, StoreProvider};

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (base file + environment overlay + env vars).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Persistence store selection.
    #[serde(default)]
    pub store: StoreConfig,
    /// Identity token settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Real-time gateway settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Media upload settings.
    #[serde(default)]
    pub media: MediaConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `base` (e.g. `config/default`) with the `config/{env}` overlay
    /// and environment variables prefixed with `STEALTH__`.
    pub fn load(base: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(base).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("STEALTH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Configuration suitable for tests and local runs: in-memory store,
    /// authentication required, everything else defaulted.
    pub fn for_memory_store() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            store: StoreConfig {
                provider: StoreProvider::Memory,
            },
            auth: AuthConfig::default(),
            realtime: RealtimeConfig::default(),
            media: MediaConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
