//! Authentication types for the domain layer.
//!
//! These types describe a signed-in user and the session the auth provider
//! holds for them. They have **no provider dependencies** - the Supabase
//! adapter and the in-memory mock both populate them through the
//! `SessionProvider` and `SessionValidator` ports.
//!
//! Access and refresh tokens are wrapped in [`SecretString`] so they never
//! show up in `Debug` output or logs.

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use super::{Email, Timestamp, UserId, ValidationError};

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Identity of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The unique user identifier from the auth provider.
    pub id: UserId,

    /// User's email address as reported by the provider.
    pub email: String,

    /// Display name from user metadata (`full_name`), if set.
    pub display_name: Option<String>,

    /// Whether the provider has confirmed the email address.
    pub email_verified: bool,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        display_name: Option<String>,
        email_verified: bool,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            display_name,
            email_verified,
        }
    }

    /// Returns the user's display name, or email as fallback.
    pub fn display_name_or_email(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// A live session held by the auth provider.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: AuthenticatedUser,
    access_token: SecretString,
    refresh_token: Option<SecretString>,
    expires_at: Option<Timestamp>,
}

impl Session {
    /// Creates a session for a user with the given access token.
    pub fn new(user: AuthenticatedUser, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: SecretString::new(access_token.into()),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Attaches a refresh token.
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::new(token.into()));
        self
    }

    /// Attaches an expiry.
    pub fn with_expiry(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Shorthand for the session's user id.
    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }

    /// Returns the raw access token for outgoing requests.
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Returns the raw refresh token, if any.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose_secret().as_str())
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    /// True once the session's expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|ts| ts.has_passed())
    }
}

/// Kind of session change pushed by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Session restored on subscribe (provider-dependent).
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A pushed session change: the event plus the session it leaves behind.
#[derive(Debug, Clone)]
pub struct SessionChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl SessionChange {
    pub fn signed_in(session: Session) -> Self {
        Self {
            event: AuthEvent::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            event: AuthEvent::SignedOut,
            session: None,
        }
    }

    /// The user the change leaves signed in, if any.
    pub fn user_id(&self) -> Option<&UserId> {
        self.session.as_ref().map(Session::user_id)
    }
}

/// Email/password pair submitted by the sign-in form.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: Email,
    password: SecretString,
}

impl Credentials {
    pub fn new(email: Email, password: impl Into<String>) -> Self {
        Self {
            email,
            password: SecretString::new(password.into()),
        }
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// Validated admin sign-up form.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub full_name: String,
    pub credentials: Credentials,
}

impl SignUpRequest {
    /// Validates the sign-up form fields.
    pub fn new(
        full_name: impl Into<String>,
        email: impl AsRef<str>,
        password: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let full_name = full_name.into().trim().to_string();
        if full_name.is_empty() {
            return Err(ValidationError::empty_field("full_name"));
        }
        let email = Email::parse(email)?;
        let password = password.into();
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::too_short("password", MIN_PASSWORD_LEN));
        }
        Ok(Self {
            full_name,
            credentials: Credentials::new(email, password),
        })
    }
}

/// Result of a successful sign-up call.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The provider sent a confirmation link; no session yet.
    ConfirmationRequired { email: Email },
    /// The provider signed the new user in immediately.
    SignedIn(Session),
}

/// Authentication errors.
///
/// These errors are **domain-centric** - they describe what went wrong
/// from the application's perspective, not the auth provider's.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Email/password did not match an account.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// The token is missing, malformed, or was rejected by the provider.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token is valid but the user no longer exists.
    #[error("User not found")]
    UserNotFound,

    /// The provider refused to create the account.
    #[error("Sign-up rejected: {0}")]
    SignUpRejected(String),

    /// The authentication service is unavailable (network, config, etc.).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error indicates the user should re-authenticate.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidToken | AuthError::TokenExpired | AuthError::UserNotFound
        )
    }
}
