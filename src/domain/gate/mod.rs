//! Gate module - vocabulary of the access gate.
//!
//! - `GatePolicy` - which route tree is being protected and what it requires
//! - `AccessDecision` - outcome of one authorization pass (fail-closed)
//! - `GateState` / `GatePhase` - the gate's explicit state machine

mod decision;
mod policy;
mod state;

pub use decision::{AccessDecision, DenialReason};
pub use policy::GatePolicy;
pub use state::{GatePhase, GateState, GateTransition};
