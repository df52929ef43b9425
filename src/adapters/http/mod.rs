//! HTTP adapters - REST API for the gated trees.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::AppState;
pub use middleware::{gate_middleware, GateLayerState, GateRejection, RequireSession};
pub use routes::{api_router, app};
