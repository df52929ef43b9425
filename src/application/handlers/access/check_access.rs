//! CheckAccessHandler - one authorization pass for one session.
//!
//! The check is **fail-closed**: it never returns an error, and every error
//! it meets becomes a denial.

use std::sync::Arc;

use crate::domain::foundation::{Email, Session};
use crate::domain::gate::{AccessDecision, DenialReason, GatePolicy};
use crate::ports::ProfileRepository;

use super::EnsureProfileHandler;

/// Handler deciding whether a session may enter a protected tree.
pub struct CheckAccessHandler {
    repository: Arc<dyn ProfileRepository>,
    ensure_profile: EnsureProfileHandler,
}

impl CheckAccessHandler {
    pub fn new(repository: Arc<dyn ProfileRepository>) -> Self {
        Self {
            ensure_profile: EnsureProfileHandler::new(Arc::clone(&repository)),
            repository,
        }
    }

    pub async fn handle(&self, session: &Session, policy: GatePolicy) -> AccessDecision {
        if !policy.requires_admin() {
            return AccessDecision::Granted;
        }

        let user = &session.user;
        if let Err(e) = self.ensure_profile.handle(user).await {
            tracing::error!(user_id = %user.id, error = %e, "Profile lookup failed; denying access");
            return AccessDecision::Denied(DenialReason::LookupFailed);
        }

        let email = match Email::parse(&user.email) {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Session email unusable for admin lookup");
                return AccessDecision::Denied(DenialReason::ProfileMissing);
            }
        };

        match self.repository.admin_flag_by_email(&email).await {
            Ok(Some(true)) => AccessDecision::Granted,
            Ok(Some(false)) => AccessDecision::Denied(DenialReason::NotAdmin),
            Ok(None) => AccessDecision::Denied(DenialReason::ProfileMissing),
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Admin flag lookup failed; denying access");
                AccessDecision::Denied(DenialReason::LookupFailed)
            }
        }
    }
}
