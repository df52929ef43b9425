//! PostgREST adapter for ProfileRepository.
//!
//! Talks to `/rest/v1/profiles` and the `has_any_admin` RPC. Calls use the
//! anon key as bearer unless a service key is configured; row-level
//! security on the hosted project decides what each key may see.

use async_trait::async_trait;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::adapters::supabase::{error_message, SupabaseClient};
use crate::domain::foundation::{DomainError, Email, UserId};
use crate::domain::profile::{NewProfile, Profile};
use crate::ports::{InsertOutcome, ProfileRepository};

const PROFILE_COLUMNS: &str = "id,user_id,email,full_name,is_admin,created_at,updated_at";

#[derive(Debug, Deserialize)]
struct AdminFlagRow {
    is_admin: bool,
}

/// Escapes LIKE wildcards so `ilike` compares literally.
fn like_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn transport_error(e: reqwest::Error) -> DomainError {
    DomainError::external(format!("PostgREST request failed: {}", e))
}

pub struct PostgrestProfileRepository {
    client: SupabaseClient,
    bearer: Option<SecretString>,
}

impl PostgrestProfileRepository {
    pub fn new(client: SupabaseClient) -> Self {
        Self {
            client,
            bearer: None,
        }
    }

    /// Sends `key` as bearer instead of the anon key.
    pub fn with_bearer(mut self, key: SecretString) -> Self {
        self.bearer = Some(key);
        self
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.client.rest_url(path);
        self.client.request(
            method,
            &url,
            self.bearer.as_ref().map(|k| k.expose_secret().as_str()),
        )
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, DomainError> {
        let response = builder.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let message = error_message(response).await;
            tracing::warn!(%status, %message, "PostgREST call failed");
            return Err(DomainError::external(message).with_detail("status", status.as_str()));
        }
        response.json::<T>().await.map_err(transport_error)
    }
}

#[async_trait]
impl ProfileRepository for PostgrestProfileRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        let rows: Vec<Profile> = self
            .fetch(self.request(Method::GET, "profiles").query(&[
                ("select", PROFILE_COLUMNS.to_string()),
                ("user_id", format!("eq.{}", user_id)),
            ]))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_if_absent(&self, profile: &NewProfile) -> Result<InsertOutcome, DomainError> {
        let rows: Vec<Profile> = self
            .fetch(
                self.request(Method::POST, "profiles")
                    .query(&[("on_conflict", "user_id"), ("select", PROFILE_COLUMNS)])
                    .header("Prefer", "resolution=ignore-duplicates,return=representation")
                    .json(&[profile]),
            )
            .await?;
        Ok(match rows.into_iter().next() {
            Some(created) => InsertOutcome::Created(created),
            None => InsertOutcome::AlreadyExists,
        })
    }

    async fn admin_flag_by_email(&self, email: &Email) -> Result<Option<bool>, DomainError> {
        let rows: Vec<AdminFlagRow> = self
            .fetch(self.request(Method::GET, "profiles").query(&[
                ("select", "is_admin".to_string()),
                ("email", format!("ilike.{}", like_literal(email.as_str()))),
                ("order", "created_at.asc".to_string()),
                ("limit", "1".to_string()),
            ]))
            .await?;
        Ok(rows.into_iter().next().map(|row| row.is_admin))
    }

    async fn has_any_admin(&self) -> Result<bool, DomainError> {
        self.fetch(self.request(Method::POST, "rpc/has_any_admin").json(&json!({})))
            .await
    }
}
