//! HTTP middleware for axum.
//!
//! - `gate` - Session gate middleware and extractors

pub mod gate;

pub use gate::{gate_middleware, GateLayerState, GateRejection, RequireSession};
