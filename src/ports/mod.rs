//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the gate and the hosted backend. Adapters implement these ports.
//!
//! - `SessionProvider` - current session, change subscription, sign-in/out/up
//! - `SessionValidator` - bearer token to session, for server-side gating
//! - `ProfileRepository` - profile lookup, insert-or-ignore, admin flag

mod profile_repository;
mod session_provider;
mod session_validator;

pub use profile_repository::{InsertOutcome, ProfileRepository};
pub use session_provider::{SessionProvider, SessionSubscription};
pub use session_validator::SessionValidator;
