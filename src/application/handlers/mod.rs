//! Application handlers.
//!
//! Handlers orchestrate the ports for the gate and the HTTP surface.

pub mod access;
pub mod signup;

pub use access::{CheckAccessHandler, EnsureProfileHandler, EnsureProfileOutcome};
pub use signup::{AdminSignupCommand, AdminSignupError, AdminSignupHandler, SignupAvailability};
