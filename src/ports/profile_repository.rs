//! ProfileRepository port for the `profiles` table.
//!
//! The table is owned by the hosted backend. The gate reads it, and writes
//! it only to provision a missing row for the signed-in user. Other tabs or
//! devices may provision the same row concurrently, so inserts are
//! insert-or-ignore: implementations must never fail because the row
//! already exists.

use async_trait::async_trait;

use crate::domain::{
    foundation::{DomainError, Email, UserId},
    profile::{NewProfile, Profile},
};

/// Result of an insert-or-ignore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Created(Profile),
    /// A row for this user already existed; nothing was written.
    AlreadyExists,
}

impl InsertOutcome {
    pub fn was_created(&self) -> bool {
        matches!(self, InsertOutcome::Created(_))
    }
}

/// Repository for profile rows.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Find the profile for a user id.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError>;

    /// Insert a profile unless one already exists for the user.
    async fn insert_if_absent(&self, profile: &NewProfile) -> Result<InsertOutcome, DomainError>;

    /// Read the admin flag of the profile with this email (case-insensitive).
    ///
    /// Returns `Ok(None)` when no profile matches.
    async fn admin_flag_by_email(&self, email: &Email) -> Result<Option<bool>, DomainError>;

    /// True if at least one profile carries the admin flag.
    async fn has_any_admin(&self) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    #[test]
    fn insert_outcome_reports_creation() {
        let new = NewProfile {
            user_id: UserId::new("u-1").unwrap(),
            email: "a@example.com".to_string(),
            full_name: None,
        };
        let created = InsertOutcome::Created(Profile::from_new(new, Timestamp::now()));
        assert!(created.was_created());
        assert!(!InsertOutcome::AlreadyExists.was_created());
    }

    #[test]
    fn profile_repository_trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn ProfileRepository>();
    }
}
