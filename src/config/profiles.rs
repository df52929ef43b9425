//! Profile store selection

use serde::Deserialize;

/// Where profile rows are read and written
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfileBackend {
    /// Hosted tables through PostgREST
    #[default]
    Rest,
    /// Direct PostgreSQL connection (requires the database section)
    Postgres,
}

/// Profile store configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfilesConfig {
    #[serde(default)]
    pub backend: ProfileBackend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_defaults_to_rest() {
        assert_eq!(ProfilesConfig::default().backend, ProfileBackend::Rest);
    }

    #[test]
    fn test_backend_deserialization() {
        let config: ProfilesConfig = serde_json::from_str(r#"{"backend":"postgres"}"#).unwrap();
        assert_eq!(config.backend, ProfileBackend::Postgres);
    }
}
