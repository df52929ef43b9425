//! Sign-up handlers.

mod admin_signup;

pub use admin_signup::{AdminSignupCommand, AdminSignupError, AdminSignupHandler, SignupAvailability};
