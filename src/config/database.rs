//! Direct PostgreSQL access for the `postgres` profile backend.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use super::error::ValidationError;

const MAX_POOL_SIZE: u32 = 50;

/// `PORTAL_GATE__DATABASE__*`. The gate issues one or two short queries per
/// check, so the pool stays small.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; may carry the password.
    pub url: SecretString,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Apply `migrations/` before serving.
    #[serde(default)]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.pool_size)
            .acquire_timeout(Duration::from_secs(self.connect_timeout_secs))
            .connect(self.url.expose_secret())
            .await
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = self.url.expose_secret();
        if url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("DATABASE__URL"));
        }
        if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.pool_size == 0 || self.pool_size > MAX_POOL_SIZE {
            return Err(ValidationError::InvalidPoolSize(MAX_POOL_SIZE));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_pool_size() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    5
}
