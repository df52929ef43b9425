//! State machine trait for phase enums.
//!
//! Gives data-free phase tags a single place to declare their legal
//! transitions, so the component that owns the data can refuse an illegal
//! move instead of silently applying it.

use super::ValidationError;

/// Trait for enums that represent the phases of a state machine.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for GatePhase {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         self.valid_transitions().contains(target)
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Initial => vec![Loading],
///             // ... etc
///         }
///     }
/// }
///
/// let next = current.transition_to(GatePhase::Loading)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
