//! Profile entity and its insert projection.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthenticatedUser, ProfileId, Timestamp, UserId};

/// One row of the `profiles` table.
///
/// Invariant (enforced by the store): at most one row per `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Profile {
    /// Materializes a freshly inserted row. New rows are never admins.
    pub fn from_new(new: NewProfile, now: Timestamp) -> Self {
        Self {
            id: ProfileId::new(),
            user_id: new.user_id,
            email: new.email,
            full_name: new.full_name,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the admin flag, bumping `updated_at`.
    pub fn set_admin(&mut self, is_admin: bool, now: Timestamp) {
        self.is_admin = is_admin;
        self.updated_at = now;
    }
}

/// Columns supplied when provisioning a profile for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProfile {
    pub user_id: UserId,
    pub email: String,
    pub full_name: Option<String>,
}

impl NewProfile {
    /// Defaults taken from the session: the display name, falling back to email.
    pub fn for_user(user: &AuthenticatedUser) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            full_name: Some(user.display_name_or_email().to_string()),
        }
    }
}
