//! Profile module - the persisted mirror of an authenticated user.
//!
//! A profile row carries the `is_admin` flag the access gate reads. Rows are
//! created lazily on first authenticated visit and are otherwise owned by
//! the hosted backend.

mod record;

pub use record::{NewProfile, Profile};
