//! Domain layer containing the access gate's types and rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, email, session, errors, state machine trait)
//! - `profile` - Profile row mirrored from the auth user, carrying the admin flag
//! - `gate` - Gate policy, access decisions and the gate state machine

pub mod foundation;
pub mod gate;
pub mod profile;
