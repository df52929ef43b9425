//! HTTP listener settings.

use serde::{Deserialize, Deserializer};
use std::net::SocketAddr;
use std::time::Duration;

use super::error::ValidationError;

/// Deployment stage. Production switches logs to JSON and requires HTTPS
/// for the Supabase project.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// `PORTAL_GATE__SERVER__*`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub environment: Environment,
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,
    pub timeout_secs: u64,
    /// Browser origins allowed to call the API, comma-separated in the env.
    #[serde(deserialize_with = "comma_separated")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            environment: Environment::Development,
            log_filter: "info,portal_gate=debug,sqlx=warn".to_string(),
            timeout_secs: 30,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.listen.port() == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if !(1..=300).contains(&self.timeout_secs) {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect())
}
