//! Access handlers - the authorization pass run by the gate.

mod check_access;
mod ensure_profile;

pub use check_access::CheckAccessHandler;
pub use ensure_profile::{EnsureProfileHandler, EnsureProfileOutcome};
