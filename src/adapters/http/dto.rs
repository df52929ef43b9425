//! Request and response bodies for the gate API.

use serde::{Deserialize, Serialize};

use crate::application::handlers::SignupAvailability;
use crate::domain::foundation::{Session, SignUpOutcome};
use crate::domain::gate::GatePolicy;

/// Signed-in user as shown to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

impl From<&Session> for UserView {
    fn from(session: &Session) -> Self {
        Self {
            id: session.user_id().to_string(),
            email: session.user.email.clone(),
            display_name: session.user.display_name_or_email().to_string(),
        }
    }
}

/// Response for `GET /api/{tree}/access`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessResponse {
    pub granted: bool,
    pub policy: GatePolicy,
    pub tree: String,
    pub user: UserView,
}

impl AccessResponse {
    pub fn granted(policy: GatePolicy, session: &Session) -> Self {
        Self {
            granted: true,
            policy,
            tree: policy.tree().to_string(),
            user: UserView::from(session),
        }
    }
}

/// Response for `GET /api/admin-signup`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignupAvailabilityResponse {
    pub available: bool,
}

impl From<SignupAvailability> for SignupAvailabilityResponse {
    fn from(availability: SignupAvailability) -> Self {
        Self {
            available: availability.is_open(),
        }
    }
}

/// Request body for `POST /api/admin-signup`.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// Response for a successful bootstrap sign-up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminSignupResponse {
    /// A confirmation link was sent.
    ConfirmationRequired { email: String },
    /// The account is active and signed in.
    SignedIn { user: UserView },
}

impl From<SignUpOutcome> for AdminSignupResponse {
    fn from(outcome: SignUpOutcome) -> Self {
        match outcome {
            SignUpOutcome::ConfirmationRequired { email } => AdminSignupResponse::ConfirmationRequired {
                email: email.to_string(),
            },
            SignUpOutcome::SignedIn(session) => AdminSignupResponse::SignedIn {
                user: UserView::from(&session),
            },
        }
    }
}

/// Response for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Create an error response with details.
    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{AuthenticatedUser, Email, UserId};

    fn session() -> Session {
        Session::new(
            AuthenticatedUser::new(UserId::new("u-1").unwrap(), "pat@example.com", None, true),
            "secret-token",
        )
    }

    #[test]
    fn access_response_never_leaks_token() {
        let response = AccessResponse::granted(GatePolicy::AdminOnly, &session());
        let json = serde_json::to_string(&response).unwrap();

        assert!(!json.contains("secret-token"));
        assert!(json.contains(r#""policy":"admin_only""#));
        assert!(json.contains(r#""tree":"admin""#));
    }

    #[test]
    fn user_view_falls_back_to_email_for_name() {
        let view = UserView::from(&session());
        assert_eq!(view.display_name, "pat@example.com");
    }

    #[test]
    fn signup_response_is_tagged_by_status() {
        let outcome = SignUpOutcome::ConfirmationRequired {
            email: Email::parse("first@example.com").unwrap(),
        };
        let json = serde_json::to_value(AdminSignupResponse::from(outcome)).unwrap();

        assert_eq!(json["status"], "confirmation_required");
        assert_eq!(json["email"], "first@example.com");
    }

    #[test]
    fn error_response_serializes_without_details_when_none() {
        let response = ErrorResponse::new("NOT_FOUND", "Not found");
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("details"));
    }

    #[test]
    fn error_response_with_details_includes_details() {
        let details = serde_json::json!({"field": "password"});
        let response = ErrorResponse::with_details("VALIDATION_FAILED", "Invalid", details.clone());
        assert_eq!(response.details, Some(details));
    }
}
