//! HTTP handlers for the gate API.
//!
//! These handlers connect Axum routes to the application layer handlers.

use std::sync::Arc;

use axum::extract::{Extension, Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::handlers::{AdminSignupCommand, AdminSignupError, AdminSignupHandler};
use crate::config::FeatureFlags;
use crate::domain::foundation::AuthError;
use crate::domain::gate::GatePolicy;
use crate::ports::{ProfileRepository, SessionProvider, SessionValidator};

use super::dto::{
    AccessResponse, AdminSignupRequest, AdminSignupResponse, ErrorResponse, HealthResponse,
    SignupAvailabilityResponse,
};
use super::middleware::{GateLayerState, RequireSession};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped dependencies
/// for efficient sharing across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionProvider>,
    pub validator: Arc<dyn SessionValidator>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub features: FeatureFlags,
}

impl AppState {
    pub fn admin_signup_handler(&self) -> AdminSignupHandler {
        AdminSignupHandler::new(
            self.sessions.clone(),
            self.profiles.clone(),
            self.features.admin_signup_enabled,
        )
    }

    /// Middleware state enforcing `policy`.
    pub fn gate(&self, policy: GatePolicy) -> GateLayerState {
        GateLayerState::new(self.validator.clone(), self.profiles.clone(), policy)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Mapping
// ════════════════════════════════════════════════════════════════════════════════

/// API error for the bootstrap sign-up endpoint.
pub struct SignupApiError {
    error: AdminSignupError,
    verbose: bool,
}

impl SignupApiError {
    fn new(error: AdminSignupError, verbose: bool) -> Self {
        Self { error, verbose }
    }
}

impl IntoResponse for SignupApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.error {
            AdminSignupError::Closed => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new("SIGNUP_CLOSED", "Admin sign-up is not available"),
            ),
            AdminSignupError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_details(
                    "VALIDATION_FAILED",
                    e.to_string(),
                    serde_json::json!({ "field": e.field() }),
                ),
            ),
            AdminSignupError::Auth(AuthError::SignUpRejected(message)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::new("SIGNUP_REJECTED", message),
            ),
            AdminSignupError::Auth(e) => {
                tracing::error!(error = %e, "Sign-up failed");
                let message = if self.verbose {
                    e.to_string()
                } else {
                    "Authentication service unavailable".to_string()
                };
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new("AUTH_UNAVAILABLE", message),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/admin/access, GET /api/portal/access
///
/// Only reached once the gate middleware has admitted the request.
pub async fn access_summary(
    Extension(policy): Extension<GatePolicy>,
    RequireSession(session): RequireSession,
) -> Json<AccessResponse> {
    Json(AccessResponse::granted(policy, &session))
}

/// GET /api/admin-signup - Whether the bootstrap form may be shown
pub async fn signup_availability(State(state): State<AppState>) -> Json<SignupAvailabilityResponse> {
    let availability = state.admin_signup_handler().availability().await;
    Json(availability.into())
}

/// POST /api/admin-signup - Register the first administrator account
pub async fn admin_signup(
    State(state): State<AppState>,
    Json(request): Json<AdminSignupRequest>,
) -> Result<impl IntoResponse, SignupApiError> {
    let command = AdminSignupCommand {
        full_name: request.full_name,
        email: request.email,
        password: request.password,
    };

    let outcome = state
        .admin_signup_handler()
        .sign_up(command)
        .await
        .map_err(|e| SignupApiError::new(e, state.features.verbose_errors))?;

    Ok((StatusCode::CREATED, Json(AdminSignupResponse::from(outcome))))
}
