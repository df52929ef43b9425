//! Supabase project configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Supabase project configuration (GoTrue + PostgREST)
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`
    pub url: String,

    /// Public anon key, sent as `apikey` on every call
    pub anon_key: SecretString,

    /// Optional service-role key used as bearer for profile reads and writes
    #[serde(default)]
    pub service_role_key: Option<SecretString>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Where sign-up confirmation links lead
    #[serde(default)]
    pub signup_redirect_url: Option<String>,
}

impl SupabaseConfig {
    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate Supabase configuration
    ///
    /// In production, requires HTTPS for the project URL.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("SUPABASE__URL"));
        }
        if self.anon_key.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("SUPABASE__ANON_KEY"));
        }
        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(ValidationError::InvalidSupabaseUrl);
        }
        if *environment == Environment::Production && !self.url.starts_with("https://") {
            return Err(ValidationError::SupabaseUrlMustBeHttps);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: SecretString::new(String::new()),
            service_role_key: None,
            request_timeout_secs: default_request_timeout(),
            signup_redirect_url: None,
        }
    }
}

fn default_request_timeout() -> u64 {
    10
}
