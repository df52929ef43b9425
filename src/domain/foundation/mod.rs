//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, auth types and error types
//! that form the vocabulary of the access gate.

mod auth;
mod email;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{
    AuthError, AuthEvent, AuthenticatedUser, Credentials, Session, SessionChange,
    SignUpOutcome, SignUpRequest, MIN_PASSWORD_LEN,
};
pub use email::Email;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ProfileId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
