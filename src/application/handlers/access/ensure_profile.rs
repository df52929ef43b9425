//! EnsureProfileHandler - provisions a missing profile for a signed-in user.
//!
//! Self-healing step run before every admin check. It is not a general write
//! path: it only ever inserts the session's own row, and only when the read
//! found none.

use std::sync::Arc;

use crate::domain::foundation::{AuthenticatedUser, DomainError};
use crate::domain::profile::NewProfile;
use crate::ports::{InsertOutcome, ProfileRepository};

/// What provisioning did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureProfileOutcome {
    /// A row was already there; nothing was written.
    Existing,
    /// A row was inserted (or another tab won the race and inserted it).
    Created,
    /// The insert failed. Swallowed: the admin read that follows fails
    /// closed on its own if the row is still missing.
    InsertFailed,
}

/// Handler for the ensure-profile step.
pub struct EnsureProfileHandler {
    repository: Arc<dyn ProfileRepository>,
}

impl EnsureProfileHandler {
    pub fn new(repository: Arc<dyn ProfileRepository>) -> Self {
        Self { repository }
    }

    /// Ensures `user` has a profile row.
    ///
    /// # Errors
    ///
    /// Only the existence read propagates its error; the caller treats it as
    /// a failed lookup.
    pub async fn handle(&self, user: &AuthenticatedUser) -> Result<EnsureProfileOutcome, DomainError> {
        if self.repository.find_by_user(&user.id).await?.is_some() {
            return Ok(EnsureProfileOutcome::Existing);
        }

        match self.repository.insert_if_absent(&NewProfile::for_user(user)).await {
            Ok(InsertOutcome::Created(profile)) => {
                tracing::info!(user_id = %user.id, profile_id = %profile.id, "Provisioned profile");
                Ok(EnsureProfileOutcome::Created)
            }
            Ok(InsertOutcome::AlreadyExists) => {
                tracing::debug!(user_id = %user.id, "Profile provisioned concurrently");
                Ok(EnsureProfileOutcome::Created)
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Profile provisioning failed; continuing");
                Ok(EnsureProfileOutcome::InsertFailed)
            }
        }
    }
}
