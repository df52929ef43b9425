//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `PORTAL_GATE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use portal_gate::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Listening on {}", config.server.listen);
//! ```

mod database;
mod error;
mod features;
mod profiles;
mod server;
mod supabase;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use features::FeatureFlags;
pub use profiles::{ProfileBackend, ProfilesConfig};
pub use server::{Environment, ServerConfig};
pub use supabase::SupabaseConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Listener, environment and logging
    #[serde(default)]
    pub server: ServerConfig,

    /// Supabase project (auth and hosted tables)
    pub supabase: SupabaseConfig,

    /// Direct PostgreSQL connection, used by the postgres profile backend
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Profile store selection
    #[serde(default)]
    pub profiles: ProfilesConfig,

    /// Feature flags
    #[serde(default)]
    pub features: FeatureFlags,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PORTAL_GATE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `PORTAL_GATE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PORTAL_GATE__SUPABASE__URL=...` -> `supabase.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PORTAL_GATE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.supabase.validate(&self.server.environment)?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        if self.profiles.backend == ProfileBackend::Postgres && self.database.is_none() {
            return Err(ValidationError::DatabaseRequiredForBackend);
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
