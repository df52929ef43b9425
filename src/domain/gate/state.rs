//! Access gate states.
//!
//! `GateState` carries the data each state needs; `GatePhase` is its
//! data-free tag and owns the transition table.
//!
//! ```text
//! Initial ─► Loading ─┬─► Unauthenticated
//!                     └─► CheckingAuthorization ─┬─► Authorized
//!                                                └─► Unauthorized
//! ```
//!
//! Every settled state may move back to `Loading` (reload, sign-in), to
//! `CheckingAuthorization` (a new session was pushed) or to
//! `Unauthenticated` (the session was cleared).

use crate::domain::foundation::{Session, StateMachine, UserId};

use super::DenialReason;

/// Data-free tag of a [`GateState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatePhase {
    Initial,
    Loading,
    Unauthenticated,
    CheckingAuthorization,
    Unauthorized,
    Authorized,
}

impl StateMachine for GatePhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use GatePhase::*;
        match self {
            Initial => vec![Loading],
            Loading => vec![Loading, Unauthenticated, CheckingAuthorization],
            CheckingAuthorization => vec![
                Loading,
                Unauthenticated,
                CheckingAuthorization,
                Authorized,
                Unauthorized,
            ],
            Unauthenticated => vec![Loading, CheckingAuthorization],
            Unauthorized | Authorized => vec![Loading, Unauthenticated, CheckingAuthorization],
        }
    }
}

/// State the gate surfaces to the route tree it protects.
#[derive(Debug, Clone, Default)]
pub enum GateState {
    /// No session check performed yet.
    #[default]
    Initial,
    /// Session fetch in flight.
    Loading,
    /// No active session: render the sign-in form.
    Unauthenticated,
    /// Session present, authorization lookup in flight.
    CheckingAuthorization { session: Session },
    /// Session present but access denied: render the access-denied view.
    Unauthorized {
        session: Session,
        reason: DenialReason,
    },
    /// Session present and access granted: render the protected tree.
    Authorized { session: Session },
}

impl GateState {
    pub fn phase(&self) -> GatePhase {
        match self {
            GateState::Initial => GatePhase::Initial,
            GateState::Loading => GatePhase::Loading,
            GateState::Unauthenticated => GatePhase::Unauthenticated,
            GateState::CheckingAuthorization { .. } => GatePhase::CheckingAuthorization,
            GateState::Unauthorized { .. } => GatePhase::Unauthorized,
            GateState::Authorized { .. } => GatePhase::Authorized,
        }
    }

    /// The session this state is about, if any.
    pub fn session(&self) -> Option<&Session> {
        match self {
            GateState::CheckingAuthorization { session }
            | GateState::Unauthorized { session, .. }
            | GateState::Authorized { session } => Some(session),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.session().map(Session::user_id)
    }

    pub fn denial(&self) -> Option<DenialReason> {
        match self {
            GateState::Unauthorized { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// True only in `Authorized`; the protected tree renders on nothing else.
    pub fn grants_access(&self) -> bool {
        matches!(self, GateState::Authorized { .. })
    }

    /// True while the gate is waiting on a remote call.
    pub fn is_pending(&self) -> bool {
        matches!(
            self.phase(),
            GatePhase::Initial | GatePhase::Loading | GatePhase::CheckingAuthorization
        )
    }
}

/// One applied state change, as published to transition observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateTransition {
    pub from: GatePhase,
    pub to: GatePhase,
}
