//! AdminSignupHandler - bootstrap sign-up for the first administrator.
//!
//! The form is offered only while the deployment flag allows it and no
//! admin profile exists yet. This handler only registers the auth account.
//! The admin flag is granted by the profile store when that account's
//! profile row is inserted while no admin exists (see the
//! `profiles_bootstrap_first_admin` trigger).

use std::sync::Arc;

use thiserror::Error;

use crate::domain::foundation::{AuthError, SignUpOutcome, SignUpRequest, ValidationError};
use crate::ports::{ProfileRepository, SessionProvider};

/// Whether the bootstrap form may be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignupAvailability {
    Open,
    Closed,
}

impl SignupAvailability {
    pub fn is_open(&self) -> bool {
        matches!(self, SignupAvailability::Open)
    }
}

/// Raw form input.
#[derive(Debug, Clone)]
pub struct AdminSignupCommand {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum AdminSignupError {
    #[error("Admin sign-up is not available")]
    Closed,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub struct AdminSignupHandler {
    sessions: Arc<dyn SessionProvider>,
    profiles: Arc<dyn ProfileRepository>,
    enabled: bool,
}

impl AdminSignupHandler {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        profiles: Arc<dyn ProfileRepository>,
        enabled: bool,
    ) -> Self {
        Self {
            sessions,
            profiles,
            enabled,
        }
    }

    /// Open only when the flag is set and no admin exists. A failed admin
    /// lookup closes the form.
    pub async fn availability(&self) -> SignupAvailability {
        if !self.enabled {
            return SignupAvailability::Closed;
        }
        match self.profiles.has_any_admin().await {
            Ok(false) => SignupAvailability::Open,
            Ok(true) => SignupAvailability::Closed,
            Err(e) => {
                tracing::warn!(error = %e, "Admin existence check failed; closing sign-up");
                SignupAvailability::Closed
            }
        }
    }

    pub async fn sign_up(&self, cmd: AdminSignupCommand) -> Result<SignUpOutcome, AdminSignupError> {
        let request = SignUpRequest::new(cmd.full_name, cmd.email, cmd.password)?;

        if !self.availability().await.is_open() {
            return Err(AdminSignupError::Closed);
        }

        let outcome = self.sessions.sign_up(&request).await?;
        tracing::info!(
            email = %request.credentials.email,
            "Bootstrap sign-up accepted; admin is granted when the profile is created"
        );
        Ok(outcome)
    }
}
