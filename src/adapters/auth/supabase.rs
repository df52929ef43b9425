//! Supabase GoTrue adapter.
//!
//! Implements [`SessionProvider`] (holds the signed-in session and pushes
//! changes, like the browser client does) and [`SessionValidator`] (resolves
//! bearer tokens through `GET /auth/v1/user`).
//!
//! # Example
//!
//! ```ignore
//! let client = SupabaseClient::new(url, anon_key, Duration::from_secs(10))?;
//! let auth = Arc::new(SupabaseAuthClient::new(client));
//! let gate = AccessGate::new(auth.clone(), profiles, GatePolicy::AdminOnly);
//! ```

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{broadcast, RwLock};

use crate::adapters::supabase::{error_message, SupabaseClient};
use crate::domain::foundation::{
    AuthError, AuthEvent, AuthenticatedUser, Credentials, Email, Session, SessionChange,
    SignUpOutcome, SignUpRequest, Timestamp, UserId,
};
use crate::ports::{SessionProvider, SessionSubscription, SessionValidator};

const CHANGE_CAPACITY: usize = 32;

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    email: Option<String>,
    email_confirmed_at: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
    name: Option<String>,
}

impl GoTrueUser {
    fn into_user(self) -> Result<AuthenticatedUser, AuthError> {
        let id = UserId::new(self.id).map_err(|_| {
            tracing::warn!("GoTrue returned a user without an id");
            AuthError::InvalidToken
        })?;
        let email = self.email.ok_or_else(|| {
            tracing::warn!(user_id = %id, "GoTrue user has no email");
            AuthError::InvalidToken
        })?;
        Ok(AuthenticatedUser::new(
            id,
            email,
            self.user_metadata.full_name.or(self.user_metadata.name),
            self.email_confirmed_at.is_some(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: GoTrueUser,
}

impl TokenResponse {
    fn into_session(self) -> Result<Session, AuthError> {
        let expires_at = self
            .expires_at
            .and_then(Timestamp::from_unix_seconds)
            .or_else(|| self.expires_in.map(|secs| Timestamp::now().plus_seconds(secs)));
        let mut session = Session::new(self.user.into_user()?, self.access_token);
        if let Some(refresh) = self.refresh_token {
            session = session.with_refresh_token(refresh);
        }
        if let Some(at) = expires_at {
            session = session.with_expiry(at);
        }
        Ok(session)
    }
}

/// `/signup` answers with a session when confirmation is off, else with
/// the bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    Pending(GoTrueUser),
}

fn transport_error(e: reqwest::Error) -> AuthError {
    tracing::error!(error = %e, "GoTrue request failed");
    AuthError::service_unavailable(e.to_string())
}

/// GoTrue-backed session provider and validator.
#[derive(Debug)]
pub struct SupabaseAuthClient {
    client: SupabaseClient,
    session: RwLock<Option<Session>>,
    changes: broadcast::Sender<SessionChange>,
    redirect_to: Option<String>,
    holds_sessions: bool,
}

impl SupabaseAuthClient {
    pub fn new(client: SupabaseClient) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            client,
            session: RwLock::new(None),
            changes,
            redirect_to: None,
            holds_sessions: true,
        }
    }

    /// For a client shared by every request: sessions returned by sign-in
    /// or sign-up go back to the caller only and are never held or
    /// published.
    pub fn stateless(mut self) -> Self {
        self.holds_sessions = false;
        self
    }

    /// Where confirmation links sent by `sign_up` lead.
    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_to = Some(url.into());
        self
    }

    /// Seeds a session restored from storage. Publishes `InitialSession`.
    pub async fn restore(&self, session: Session) {
        self.store(AuthEvent::InitialSession, Some(session)).await;
    }

    async fn store(&self, event: AuthEvent, session: Option<Session>) {
        if !self.holds_sessions {
            return;
        }
        *self.session.write().await = session.clone();
        let _ = self.changes.send(SessionChange { event, session });
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let response = self
            .client
            .request(Method::POST, &self.client.auth_url("token"), None)
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => response
                .json::<TokenResponse>()
                .await
                .map_err(transport_error)?
                .into_session(),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                tracing::info!("Refresh token rejected");
                Err(AuthError::InvalidToken)
            }
            _ => Err(AuthError::service_unavailable(error_message(response).await)),
        }
    }
}

#[async_trait]
impl SessionProvider for SupabaseAuthClient {
    /// Refreshes an expired session when a refresh token is held; a
    /// rejected refresh clears the session.
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let held = self.session.read().await.clone();
        let Some(session) = held else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token().map(str::to_string) else {
            self.store(AuthEvent::SignedOut, None).await;
            return Ok(None);
        };
        match self.refresh(&refresh_token).await {
            Ok(fresh) => {
                self.store(AuthEvent::TokenRefreshed, Some(fresh.clone())).await;
                Ok(Some(fresh))
            }
            Err(e) if e.requires_reauthentication() => {
                self.store(AuthEvent::SignedOut, None).await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.changes.subscribe())
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let response = self
            .client
            .request(Method::POST, &self.client.auth_url("token"), None)
            .query(&[("grant_type", "password")])
            .json(&json!({
                "email": credentials.email.as_str(),
                "password": credentials.password(),
            }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            tracing::info!(email = %credentials.email, "Sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(AuthError::service_unavailable(error_message(response).await));
        }

        let session = response
            .json::<TokenResponse>()
            .await
            .map_err(transport_error)?
            .into_session()?;
        self.store(AuthEvent::SignedIn, Some(session.clone())).await;
        Ok(session)
    }

    /// A token the server no longer knows counts as signed out.
    async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token().to_string());

        if let Some(token) = token {
            let response = self
                .client
                .request(Method::POST, &self.client.auth_url("logout"), Some(&token))
                .send()
                .await
                .map_err(transport_error)?;
            let status = response.status();
            if !status.is_success()
                && status != StatusCode::UNAUTHORIZED
                && status != StatusCode::NOT_FOUND
            {
                return Err(AuthError::service_unavailable(error_message(response).await));
            }
        }

        self.store(AuthEvent::SignedOut, None).await;
        Ok(())
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AuthError> {
        let mut builder = self
            .client
            .request(Method::POST, &self.client.auth_url("signup"), None);
        if let Some(redirect) = &self.redirect_to {
            builder = builder.query(&[("redirect_to", redirect.as_str())]);
        }
        let response = builder
            .json(&json!({
                "email": request.credentials.email.as_str(),
                "password": request.credentials.password(),
                "data": { "full_name": request.full_name },
            }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AuthError::SignUpRejected(error_message(response).await));
        }
        if !status.is_success() {
            return Err(AuthError::service_unavailable(error_message(response).await));
        }

        match response.json::<SignUpResponse>().await.map_err(transport_error)? {
            SignUpResponse::Session(tokens) => {
                let session = tokens.into_session()?;
                self.store(AuthEvent::SignedIn, Some(session.clone())).await;
                Ok(SignUpOutcome::SignedIn(session))
            }
            SignUpResponse::Pending(user) => {
                let email = user
                    .email
                    .as_deref()
                    .and_then(|e| Email::parse(e).ok())
                    .unwrap_or_else(|| request.credentials.email.clone());
                Ok(SignUpOutcome::ConfirmationRequired { email })
            }
        }
    }
}

#[async_trait]
impl SessionValidator for SupabaseAuthClient {
    async fn validate(&self, token: &str) -> Result<Session, AuthError> {
        let response = self
            .client
            .request(Method::GET, &self.client.auth_url("user"), Some(token))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => {
                let user = response
                    .json::<GoTrueUser>()
                    .await
                    .map_err(transport_error)?
                    .into_user()?;
                Ok(Session::new(user, token))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let message = error_message(response).await;
                tracing::debug!(%message, "Token rejected by GoTrue");
                if message.to_lowercase().contains("expired") {
                    Err(AuthError::TokenExpired)
                } else {
                    Err(AuthError::InvalidToken)
                }
            }
            StatusCode::NOT_FOUND => Err(AuthError::UserNotFound),
            _ => Err(AuthError::service_unavailable(error_message(response).await)),
        }
    }
}
