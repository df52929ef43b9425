//! Shared HTTP plumbing for the Supabase adapters.
//!
//! Every call carries the project `apikey` header. The bearer is either the
//! caller's access token or, for anonymous calls, the anon key itself.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Base client for one Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    base_url: String,
    anon_key: SecretString,
    http: reqwest::Client,
}

impl SupabaseClient {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GoTrue endpoint, e.g. `auth_url("user")`.
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// PostgREST endpoint, e.g. `rest_url("profiles")`.
    pub fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    /// Starts a request with the project headers set.
    pub fn request(&self, method: Method, url: &str, bearer: Option<&str>) -> RequestBuilder {
        let anon = self.anon_key.expose_secret();
        self.http
            .request(method, url)
            .header("apikey", anon.as_str())
            .bearer_auth(bearer.unwrap_or(anon.as_str()))
    }
}

/// Error body returned by GoTrue (`error`/`error_description` or
/// `code`/`msg`) and PostgREST (`message`/`details`).
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

impl ApiErrorBody {
    fn describe(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .map(|head| match self.details {
                Some(details) => format!("{}: {}", head, details),
                None => head,
            })
    }
}

/// Best-effort human message for a failed response.
pub(crate) async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(ApiErrorBody::describe)
        .unwrap_or_else(|| format!("HTTP {}", status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> SupabaseClient {
        SupabaseClient::new(url, SecretString::new("anon".to_string()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = client("https://proj.supabase.co/");
        assert_eq!(client.auth_url("user"), "https://proj.supabase.co/auth/v1/user");
        assert_eq!(client.rest_url("profiles"), "https://proj.supabase.co/rest/v1/profiles");
    }

    #[test]
    fn gotrue_error_prefers_description() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(body.describe().as_deref(), Some("Invalid login credentials"));
    }

    #[test]
    fn postgrest_error_includes_details() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"code":"23505","message":"duplicate key value","details":"Key (user_id) exists"}"#,
        )
        .unwrap();
        assert_eq!(
            body.describe().as_deref(),
            Some("duplicate key value: Key (user_id) exists")
        );
    }
}
