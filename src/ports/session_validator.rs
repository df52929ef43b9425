//! Session validation port for bearer tokens.
//!
//! Server-side counterpart of [`SessionProvider`](super::SessionProvider):
//! the HTTP gate receives an access token per request and needs the session
//! it stands for. Implementations exist for Supabase GoTrue and for
//! in-memory testing.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, Session};

/// Resolves access tokens to sessions.
///
/// # Contract
///
/// Implementations must:
/// - Return `AuthError::InvalidToken` for unknown or rejected tokens
/// - Return `AuthError::TokenExpired` for tokens past their expiry
/// - Return `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate an access token and return the session it belongs to.
    ///
    /// * `token` - The raw token (without "Bearer " prefix)
    async fn validate(&self, token: &str) -> Result<Session, AuthError>;
}
