//! Session provider port - the injected auth capability.
//!
//! The gate never reaches for a process-wide auth client. It is handed a
//! `SessionProvider` and asks it for the current session, for a stream of
//! session changes, and for the user-triggered sign-in/sign-out/sign-up
//! actions. Implementations exist for Supabase GoTrue and for in-memory
//! testing.
//!
//! # Subscription contract
//!
//! `subscribe()` returns a [`SessionSubscription`]. Changes published after
//! the call are delivered in order. Dropping the subscription unsubscribes.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::foundation::{
    AuthError, Credentials, Session, SessionChange, SignUpOutcome, SignUpRequest,
};

/// Auth collaborator used by the access gate.
///
/// # Contract
///
/// Implementations must:
/// - Return `Ok(None)` from `current_session` when nobody is signed in
/// - Publish a `SessionChange` to every live subscription whenever the held
///   session appears, changes user, refreshes, or is cleared
/// - Return `AuthError::InvalidCredentials` for a rejected sign-in
/// - Return `AuthError::ServiceUnavailable` for transport errors
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns the session currently held, if any.
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Subscribes to session changes.
    fn subscribe(&self) -> SessionSubscription;

    /// Signs in with email and password.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    /// Signs the current user out.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Registers a new account.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AuthError>;
}

/// Live subscription to session changes. Drop it to unsubscribe.
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionChange>,
}

impl SessionSubscription {
    pub fn new(receiver: broadcast::Receiver<SessionChange>) -> Self {
        Self { receiver }
    }

    /// Waits for the next change.
    ///
    /// Returns `None` once the provider has gone away. If the subscriber
    /// fell behind, the skipped changes are dropped and the next retained
    /// one is returned; only the latest session matters to the gate.
    pub async fn next(&mut self) -> Option<SessionChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session subscription lagged; skipping stale changes");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
