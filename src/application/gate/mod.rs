//! Access gate - session-driven authorization state for a route tree.

mod access_gate;
mod epoch;

pub use access_gate::{AccessGate, GateError, GateHandle};
