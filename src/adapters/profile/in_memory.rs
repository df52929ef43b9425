//! In-memory profile store for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Email, Timestamp, UserId};
use crate::domain::profile::{NewProfile, Profile};
use crate::ports::{InsertOutcome, ProfileRepository};

/// Profile rows keyed by user id.
///
/// Reads can be forced to fail with `with_read_error`, inserts with
/// `with_insert_error`. Call counters let tests assert which paths ran.
/// `with_first_admin_bootstrap` mirrors the database trigger that makes the
/// first inserted profile an admin while no admin exists.
#[derive(Debug, Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<HashMap<String, Profile>>,
    read_error: RwLock<Option<DomainError>>,
    insert_error: RwLock<Option<DomainError>>,
    read_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    bootstrap_first_admin: bool,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an admin profile.
    pub fn with_admin(self, user_id: &str, email: &str) -> Self {
        self.insert_admin(user_id, email);
        self
    }

    /// Seeds a non-admin profile.
    pub fn with_member(self, user_id: &str, email: &str) -> Self {
        self.insert_member(user_id, email);
        self
    }

    pub fn with_first_admin_bootstrap(mut self) -> Self {
        self.bootstrap_first_admin = true;
        self
    }

    pub fn with_read_error(self, error: DomainError) -> Self {
        *self.read_error.write().unwrap() = Some(error);
        self
    }

    pub fn with_insert_error(self, error: DomainError) -> Self {
        *self.insert_error.write().unwrap() = Some(error);
        self
    }

    pub fn insert_admin(&self, user_id: &str, email: &str) {
        self.seed(user_id, email, true);
    }

    pub fn insert_member(&self, user_id: &str, email: &str) {
        self.seed(user_id, email, false);
    }

    /// Flips the admin flag of an existing profile. Returns false if the
    /// user has no profile.
    pub fn set_admin(&self, user_id: &UserId, is_admin: bool) -> bool {
        match self.profiles.write().unwrap().get_mut(user_id.as_str()) {
            Some(profile) => {
                profile.set_admin(is_admin, Timestamp::now());
                true
            }
            None => false,
        }
    }

    pub fn clear_errors(&self) {
        *self.read_error.write().unwrap() = None;
        *self.insert_error.write().unwrap() = None;
    }

    pub fn get(&self, user_id: &UserId) -> Option<Profile> {
        self.profiles.read().unwrap().get(user_id.as_str()).cloned()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.read().unwrap().len()
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    fn seed(&self, user_id: &str, email: &str, is_admin: bool) {
        let new = NewProfile {
            user_id: UserId::new(user_id).unwrap(),
            email: email.to_string(),
            full_name: None,
        };
        let mut profile = Profile::from_new(new, Timestamp::now());
        profile.is_admin = is_admin;
        self.profiles
            .write()
            .unwrap()
            .insert(user_id.to_string(), profile);
    }

    fn check_read(&self) -> Result<(), DomainError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        match self.read_error.read().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        self.check_read()?;
        Ok(self.get(user_id))
    }

    async fn insert_if_absent(&self, profile: &NewProfile) -> Result<InsertOutcome, DomainError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.insert_error.read().unwrap().clone() {
            return Err(error);
        }

        let mut profiles = self.profiles.write().unwrap();
        if profiles.contains_key(profile.user_id.as_str()) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        let mut created = Profile::from_new(profile.clone(), Timestamp::now());
        if self.bootstrap_first_admin && !profiles.values().any(|p| p.is_admin) {
            created.is_admin = true;
        }
        profiles.insert(profile.user_id.as_str().to_string(), created.clone());
        Ok(InsertOutcome::Created(created))
    }

    /// Several rows may share an email; the oldest one wins.
    async fn admin_flag_by_email(&self, email: &Email) -> Result<Option<bool>, DomainError> {
        self.check_read()?;
        Ok(self
            .profiles
            .read()
            .unwrap()
            .values()
            .filter(|p| email.matches(&p.email))
            .min_by_key(|p| p.created_at)
            .map(|p| p.is_admin))
    }

    async fn has_any_admin(&self) -> Result<bool, DomainError> {
        self.check_read()?;
        Ok(self.profiles.read().unwrap().values().any(|p| p.is_admin))
    }
}
