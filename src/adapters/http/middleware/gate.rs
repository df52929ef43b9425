//! Gate middleware and extractors for axum.
//!
//! Server-side twin of the `AccessGate`: every request to a protected
//! router resolves its bearer token to a session and runs the same
//! fail-closed access check before the handler sees it.
//!
//! ```text
//! Request → gate_middleware → validate token → check policy → injects Session
//!                                                                 ↓
//!                                     Handler → RequireSession reads from extensions
//! ```
//!
//! # Example
//!
//! ```ignore
//! let admin = Router::new()
//!     .route("/access", get(access_summary))
//!     .route_layer(middleware::from_fn_with_state(
//!         GateLayerState::new(validator, profiles, GatePolicy::AdminOnly),
//!         gate_middleware,
//!     ));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::handlers::CheckAccessHandler;
use crate::domain::foundation::{AuthError, Session};
use crate::domain::gate::{AccessDecision, GatePolicy};
use crate::ports::{ProfileRepository, SessionValidator};

use crate::adapters::http::dto::ErrorResponse;

/// Middleware state: how to resolve tokens and which policy to enforce.
#[derive(Clone)]
pub struct GateLayerState {
    validator: Arc<dyn SessionValidator>,
    checker: Arc<CheckAccessHandler>,
    policy: GatePolicy,
}

impl GateLayerState {
    pub fn new(
        validator: Arc<dyn SessionValidator>,
        profiles: Arc<dyn ProfileRepository>,
        policy: GatePolicy,
    ) -> Self {
        Self {
            validator,
            checker: Arc::new(CheckAccessHandler::new(profiles)),
            policy,
        }
    }
}

/// Gate middleware.
///
/// - No `Authorization: Bearer` header → 401
/// - Token rejected → 401; auth service down → 503
/// - Access denied by the policy → 403 with the denial reason
/// - Otherwise injects the `Session` and the `GatePolicy` and runs the handler
pub async fn gate_middleware(
    State(state): State<GateLayerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token);

    let Some(token) = token else {
        return GateRejection::Unauthenticated.into_response();
    };

    let session = match state.validator.validate(token).await {
        Ok(session) => session,
        Err(e) => return GateRejection::from(e).into_response(),
    };

    match state.checker.handle(&session, state.policy).await {
        AccessDecision::Granted => {
            tracing::debug!(user_id = %session.user_id(), policy = %state.policy, "Request admitted");
            request.extensions_mut().insert(state.policy);
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        AccessDecision::Denied(reason) => {
            tracing::info!(user_id = %session.user_id(), policy = %state.policy, ?reason, "Request denied");
            let error = ErrorResponse::with_details(
                "FORBIDDEN",
                reason.user_message(),
                serde_json::json!({ "reason": reason }),
            );
            (StatusCode::FORBIDDEN, Json(error)).into_response()
        }
    }
}

/// Token of an `Authorization` value; the scheme is case-insensitive.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim_start().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Extractor for the session admitted by [`gate_middleware`].
#[derive(Debug, Clone)]
pub struct RequireSession(pub Session);

impl<S> axum::extract::FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = GateRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<Session>()
                .cloned()
                .map(RequireSession)
                .ok_or(GateRejection::Unauthenticated)
        })
    }
}

/// Rejection type for gate failures before a policy decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRejection {
    /// No bearer token was provided.
    Unauthenticated,
    /// The token was rejected.
    InvalidToken,
    /// The token has expired.
    TokenExpired,
    /// The auth service could not be reached.
    Unavailable,
}

impl From<AuthError> for GateRejection {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::TokenExpired => GateRejection::TokenExpired,
            AuthError::ServiceUnavailable(msg) => {
                tracing::error!("Auth service unavailable: {}", msg);
                GateRejection::Unavailable
            }
            _ => GateRejection::InvalidToken,
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            GateRejection::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", "Authentication required")
            }
            GateRejection::InvalidToken => (StatusCode::UNAUTHORIZED, "AUTH_ERROR", "Invalid token"),
            GateRejection::TokenExpired => (StatusCode::UNAUTHORIZED, "AUTH_ERROR", "Token expired"),
            GateRejection::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "AUTH_UNAVAILABLE",
                "Authentication service unavailable",
            ),
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
