//! In-memory session provider for tests and local development.
//!
//! `MockSessionProvider` implements both [`SessionProvider`] and
//! [`SessionValidator`], so the same instance can drive an `AccessGate` and
//! the HTTP gate middleware.
//!
//! # Example
//!
//! ```ignore
//! use portal_gate::adapters::auth::MockSessionProvider;
//!
//! let provider = MockSessionProvider::new()
//!     .with_account("boss@example.com", "hunter22", boss_session);
//!
//! // Simulate another tab signing out
//! provider.emit_signed_out();
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::foundation::{
    AuthError, Credentials, Session, SessionChange, SignUpOutcome, SignUpRequest,
};
use crate::ports::{SessionProvider, SessionSubscription, SessionValidator};

const CHANGE_CAPACITY: usize = 32;

/// Mock session provider.
///
/// Holds at most one current session. Accounts registered with
/// `with_account` can sign in; every session it hands out is also a valid
/// bearer token for `validate`.
#[derive(Debug)]
pub struct MockSessionProvider {
    current: RwLock<Option<Session>>,
    /// email -> (password, session)
    accounts: RwLock<HashMap<String, (String, Session)>>,
    /// access token -> session
    tokens: RwLock<HashMap<String, Session>>,
    changes: broadcast::Sender<SessionChange>,
    /// Returned by `current_session` and `validate` while set
    force_error: RwLock<Option<AuthError>>,
    sign_out_error: RwLock<Option<AuthError>>,
    sign_in_calls: AtomicUsize,
    sign_up_calls: AtomicUsize,
}

impl Default for MockSessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSessionProvider {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            current: RwLock::new(None),
            accounts: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            changes,
            force_error: RwLock::new(None),
            sign_out_error: RwLock::new(None),
            sign_in_calls: AtomicUsize::new(0),
            sign_up_calls: AtomicUsize::new(0),
        }
    }

    /// Starts with `session` already held.
    pub fn with_session(self, session: Session) -> Self {
        self.register_token(&session);
        *self.current.write().unwrap() = Some(session);
        self
    }

    /// Registers an account that `sign_in` accepts.
    pub fn with_account(
        self,
        email: impl Into<String>,
        password: impl Into<String>,
        session: Session,
    ) -> Self {
        self.register_token(&session);
        self.accounts
            .write()
            .unwrap()
            .insert(email.into().to_lowercase(), (password.into(), session));
        self
    }

    /// Registers a bearer token without making it the current session.
    pub fn with_token(self, session: Session) -> Self {
        self.register_token(&session);
        self
    }

    /// Forces `current_session` and `validate` to fail.
    pub fn with_error(self, error: AuthError) -> Self {
        *self.force_error.write().unwrap() = Some(error);
        self
    }

    /// Forces `sign_out` to fail.
    pub fn with_sign_out_error(self, error: AuthError) -> Self {
        *self.sign_out_error.write().unwrap() = Some(error);
        self
    }

    pub fn clear_error(&self) {
        *self.force_error.write().unwrap() = None;
        *self.sign_out_error.write().unwrap() = None;
    }

    /// Simulates a session appearing outside the gate (another tab, a
    /// magic link, a token refresh).
    pub fn emit_signed_in(&self, session: Session) {
        self.register_token(&session);
        *self.current.write().unwrap() = Some(session.clone());
        self.publish(SessionChange::signed_in(session));
    }

    /// Simulates the session being cleared outside the gate.
    pub fn emit_signed_out(&self) {
        *self.current.write().unwrap() = None;
        self.publish(SessionChange::signed_out());
    }

    /// Publishes an arbitrary change without touching the held session.
    pub fn emit(&self, change: SessionChange) {
        self.publish(change);
    }

    pub fn current(&self) -> Option<Session> {
        self.current.read().unwrap().clone()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn sign_up_calls(&self) -> usize {
        self.sign_up_calls.load(Ordering::SeqCst)
    }

    fn register_token(&self, session: &Session) {
        self.tokens
            .write()
            .unwrap()
            .insert(session.access_token().to_string(), session.clone());
    }

    fn publish(&self, change: SessionChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        if let Some(error) = self.force_error.read().unwrap().clone() {
            return Err(error);
        }
        Ok(self.current())
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.changes.subscribe())
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);

        let session = {
            let accounts = self.accounts.read().unwrap();
            match accounts.get(credentials.email.as_str()) {
                Some((password, session)) if password == credentials.password() => session.clone(),
                _ => return Err(AuthError::InvalidCredentials),
            }
        };

        self.emit_signed_in(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(error) = self.sign_out_error.read().unwrap().clone() {
            return Err(error);
        }
        self.emit_signed_out();
        Ok(())
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AuthError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);

        if self
            .accounts
            .read()
            .unwrap()
            .contains_key(request.credentials.email.as_str())
        {
            return Err(AuthError::SignUpRejected("User already registered".to_string()));
        }

        Ok(SignUpOutcome::ConfirmationRequired {
            email: request.credentials.email.clone(),
        })
    }
}

#[async_trait]
impl SessionValidator for MockSessionProvider {
    async fn validate(&self, token: &str) -> Result<Session, AuthError> {
        if let Some(error) = self.force_error.read().unwrap().clone() {
            return Err(error);
        }

        let session = self
            .tokens
            .read()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)?;

        if session.is_expired() {
            return Err(AuthError::TokenExpired);
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{AuthenticatedUser, Email, Timestamp, UserId};

    fn session(id: &str) -> Session {
        Session::new(
            AuthenticatedUser::new(
                UserId::new(id).unwrap(),
                format!("{}@example.com", id),
                None,
                true,
            ),
            format!("token-{}", id),
        )
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials::new(Email::parse(email).unwrap(), password)
    }

    #[tokio::test]
    async fn empty_provider_has_no_session() {
        let provider = MockSessionProvider::new();
        assert!(provider.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sign_in_with_registered_account_publishes_change() {
        let provider = MockSessionProvider::new().with_account("a@example.com", "secret1", session("a"));
        let mut subscription = provider.subscribe();

        let signed_in = provider.sign_in(&credentials("a@example.com", "secret1")).await.unwrap();

        assert_eq!(signed_in.user_id().as_str(), "a");
        let change = subscription.next().await.unwrap();
        assert_eq!(change.user_id().map(UserId::as_str), Some("a"));
        assert!(provider.current().is_some());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let provider = MockSessionProvider::new().with_account("a@example.com", "secret1", session("a"));

        let result = provider.sign_in(&credentials("a@example.com", "nope123")).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert!(provider.current().is_none());
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let provider = MockSessionProvider::new().with_session(session("a"));
        let mut subscription = provider.subscribe();

        provider.sign_out().await.unwrap();

        assert!(provider.current().is_none());
        assert!(subscription.next().await.unwrap().session.is_none());
    }

    #[tokio::test]
    async fn forced_sign_out_error_keeps_session() {
        let provider = MockSessionProvider::new()
            .with_session(session("a"))
            .with_sign_out_error(AuthError::service_unavailable("offline"));

        assert!(provider.sign_out().await.is_err());
        assert!(provider.current().is_some());
    }

    #[tokio::test]
    async fn validate_resolves_known_tokens() {
        let provider = MockSessionProvider::new().with_token(session("a"));

        assert_eq!(provider.validate("token-a").await.unwrap().user_id().as_str(), "a");
        assert!(matches!(provider.validate("token-b").await, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn validate_rejects_expired_sessions() {
        let expired = session("a").with_expiry(Timestamp::now().plus_seconds(-60));
        let provider = MockSessionProvider::new().with_token(expired);

        assert!(matches!(provider.validate("token-a").await, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let provider = MockSessionProvider::new();
        let subscription = provider.subscribe();
        assert_eq!(provider.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(provider.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn sign_up_of_known_account_is_rejected() {
        let provider = MockSessionProvider::new().with_account("a@example.com", "secret1", session("a"));
        let request = SignUpRequest::new("A", "a@example.com", "secret1").unwrap();

        assert!(matches!(provider.sign_up(&request).await, Err(AuthError::SignUpRejected(_))));
    }
}
