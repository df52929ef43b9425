//! Application layer - the access gate and its handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod gate;
pub mod handlers;

pub use gate::{AccessGate, GateHandle};
pub use handlers::{
    AdminSignupCommand, AdminSignupError, AdminSignupHandler, CheckAccessHandler,
    EnsureProfileHandler, EnsureProfileOutcome, SignupAvailability,
};
