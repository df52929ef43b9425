//! AccessGate - guards a route tree behind a session and a policy.
//!
//! The gate owns one [`GateState`] and moves it through the transition
//! table in [`GatePhase`]. Inputs are the initial session fetch at mount,
//! session changes pushed by the [`SessionProvider`], and the user actions
//! `sign_in`, `sign_out` and `reload`.
//!
//! # Staleness
//!
//! Each input starts a new flow with a fresh ticket (see `epoch`). The
//! authorization lookup it triggers may finish after a newer flow started,
//! or after the gate was unmounted; such results are discarded, so the
//! visible state always reflects the latest input.
//!
//! # Example
//!
//! ```ignore
//! let gate = AccessGate::new(sessions, profiles, GatePolicy::AdminOnly);
//! let _handle = gate.mount()?;
//! let mut states = gate.watch();
//! states.wait_for(|s| !s.is_pending()).await?;
//! if gate.state().grants_access() {
//!     render_admin_tree();
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::application::handlers::CheckAccessHandler;
use crate::domain::foundation::{AuthError, Credentials, Session, SessionChange, StateMachine, UserId};
use crate::domain::gate::{AccessDecision, GatePhase, GatePolicy, GateState, GateTransition};
use crate::ports::{ProfileRepository, SessionProvider};

use super::epoch::{Epoch, Ticket};

const TRANSITION_CAPACITY: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("Access gate is already mounted")]
    AlreadyMounted,
}

/// Session gate for one protected route tree.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AccessGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    sessions: Arc<dyn SessionProvider>,
    checker: CheckAccessHandler,
    policy: GatePolicy,
    epoch: Mutex<Epoch>,
    state_tx: watch::Sender<GateState>,
    transitions_tx: broadcast::Sender<GateTransition>,
}

impl AccessGate {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        profiles: Arc<dyn ProfileRepository>,
        policy: GatePolicy,
    ) -> Self {
        let (state_tx, _) = watch::channel(GateState::Initial);
        let (transitions_tx, _) = broadcast::channel(TRANSITION_CAPACITY);
        Self {
            inner: Arc::new(GateInner {
                sessions,
                checker: CheckAccessHandler::new(profiles),
                policy,
                epoch: Mutex::new(Epoch::default()),
                state_tx,
                transitions_tx,
            }),
        }
    }

    pub fn policy(&self) -> GatePolicy {
        self.inner.policy
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> GateState {
        self.inner.state_tx.borrow().clone()
    }

    /// Receiver that always holds the latest state.
    pub fn watch(&self) -> watch::Receiver<GateState> {
        self.inner.state_tx.subscribe()
    }

    /// Every applied transition, in order.
    pub fn transitions(&self) -> broadcast::Receiver<GateTransition> {
        self.inner.transitions_tx.subscribe()
    }

    /// Starts the gate: subscribes to session changes, moves to `Loading`
    /// and fetches the current session in the background.
    ///
    /// The gate stays live until the returned handle is dropped.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(&self) -> Result<GateHandle, GateError> {
        let inner = Arc::clone(&self.inner);
        if !inner.lock_epoch().mount() {
            return Err(GateError::AlreadyMounted);
        }

        let mut subscription = inner.sessions.subscribe();
        let initial = inner.begin(None, GateState::Loading);

        let driver = Arc::clone(&inner);
        let task = tokio::spawn(async move {
            if let Some(ticket) = initial {
                let loader = Arc::clone(&driver);
                tokio::spawn(async move { loader.load_current(ticket).await });
            }
            while let Some(change) = subscription.next().await {
                driver.on_session_change(change);
            }
            tracing::debug!(policy = %driver.policy, "Session provider closed; gate stopped listening");
        });

        tracing::debug!(policy = %inner.policy, "Access gate mounted");
        Ok(GateHandle { inner, task })
    }

    /// Signs in and re-checks access for the new session.
    ///
    /// A rejected sign-in leaves the state untouched. Returns once the
    /// access decision for the new session has been applied.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let session = self.inner.sessions.sign_in(credentials).await?;
        let subject = Some(session.user_id().clone());
        let Some(ticket) = self.inner.begin(subject, GateState::Loading) else {
            return Ok(());
        };
        self.inner.check(ticket, session).await;
        Ok(())
    }

    /// Signs out. On failure the state is untouched and the error is
    /// returned for the caller to surface.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        if let Err(e) = self.inner.sessions.sign_out().await {
            tracing::warn!(policy = %self.inner.policy, error = %e, "Sign-out failed");
            return Err(e);
        }
        self.inner.begin_if(None, GateState::Unauthenticated, |_, current| {
            current.phase() != GatePhase::Unauthenticated
        });
        Ok(())
    }

    /// Repeats the full session fetch and access check.
    pub async fn reload(&self) {
        if let Some(ticket) = self.inner.begin(None, GateState::Loading) {
            self.inner.load_current(ticket).await;
        }
    }
}

impl GateInner {
    fn lock_epoch(&self) -> MutexGuard<'_, Epoch> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, subject: Option<UserId>, state: GateState) -> Option<Ticket> {
        self.begin_if(subject, state, |_, _| true)
    }

    /// Starts a new flow by publishing `state`, unless the gate is unmounted
    /// or `admit` declines.
    fn begin_if(
        &self,
        subject: Option<UserId>,
        state: GateState,
        admit: impl FnOnce(&Epoch, &GateState) -> bool,
    ) -> Option<Ticket> {
        let mut epoch = self.lock_epoch();
        let admitted = epoch.is_mounted() && admit(&epoch, &*self.state_tx.borrow());
        if !admitted {
            return None;
        }
        if !self.publish(state) {
            return None;
        }
        Some(epoch.issue(subject))
    }

    /// Applies the result of the flow holding `ticket`, if it is still current.
    fn apply(&self, ticket: Ticket, state: GateState) -> bool {
        let mut epoch = self.lock_epoch();
        if !epoch.is_current(ticket) {
            tracing::debug!(policy = %self.policy, to = ?state.phase(), "Discarding stale gate result");
            return false;
        }
        let subject = state.user_id().cloned();
        if !self.publish(state) {
            return false;
        }
        epoch.set_subject(subject);
        true
    }

    /// Caller holds the epoch lock.
    fn publish(&self, next: GateState) -> bool {
        let from = self.state_tx.borrow().phase();
        let to = next.phase();
        if !from.can_transition_to(&to) {
            tracing::error!(policy = %self.policy, ?from, ?to, "Rejected invalid gate transition");
            return false;
        }
        self.state_tx.send_replace(next);
        let _ = self.transitions_tx.send(GateTransition { from, to });
        tracing::debug!(policy = %self.policy, ?from, ?to, "Gate transition");
        true
    }

    async fn load_current(&self, ticket: Ticket) {
        match self.sessions.current_session().await {
            Ok(Some(session)) => self.check(ticket, session).await,
            Ok(None) => {
                self.apply(ticket, GateState::Unauthenticated);
            }
            Err(e) => {
                tracing::warn!(policy = %self.policy, error = %e, "Session fetch failed; treating as signed out");
                self.apply(ticket, GateState::Unauthenticated);
            }
        }
    }

    async fn check(&self, ticket: Ticket, session: Session) {
        if self.apply(
            ticket,
            GateState::CheckingAuthorization {
                session: session.clone(),
            },
        ) {
            self.decide(ticket, session).await;
        }
    }

    async fn decide(&self, ticket: Ticket, session: Session) {
        let next = match self.checker.handle(&session, self.policy).await {
            AccessDecision::Granted => GateState::Authorized { session },
            AccessDecision::Denied(reason) => {
                tracing::info!(policy = %self.policy, user_id = %session.user_id(), ?reason, "Access denied");
                GateState::Unauthorized { session, reason }
            }
        };
        self.apply(ticket, next);
    }

    /// A pushed session for the user the gate is already about re-runs the
    /// check only once that user's flow has settled and the access token
    /// differs from the one held. Echoes of the gate's own sign-in are
    /// dropped; a fresh sign-in or refresh after a denial is not.
    fn on_session_change(self: &Arc<Self>, change: SessionChange) {
        tracing::debug!(policy = %self.policy, event = ?change.event, "Session change received");
        match change.session {
            Some(session) => {
                let user = session.user_id().clone();
                let ticket = self.begin_if(
                    Some(user.clone()),
                    GateState::CheckingAuthorization {
                        session: session.clone(),
                    },
                    |epoch, current| {
                        epoch.subject() != Some(&user) || is_fresh_session(current, &session)
                    },
                );
                if let Some(ticket) = ticket {
                    let inner = Arc::clone(self);
                    tokio::spawn(async move { inner.decide(ticket, session).await });
                }
            }
            None => {
                self.begin_if(None, GateState::Unauthenticated, |_, current| {
                    current.phase() != GatePhase::Unauthenticated
                });
            }
        }
    }
}

/// True when `incoming` should replace the settled state's session.
fn is_fresh_session(current: &GateState, incoming: &Session) -> bool {
    if current.is_pending() {
        return false;
    }
    current
        .session()
        .map_or(true, |held| held.access_token() != incoming.access_token())
}

/// Keeps an [`AccessGate`] mounted. Dropping it unmounts the gate: the
/// session subscription is released and in-flight results are discarded.
pub struct GateHandle {
    inner: Arc<GateInner>,
    task: JoinHandle<()>,
}

impl GateHandle {
    pub fn unmount(self) {}
}

impl Drop for GateHandle {
    fn drop(&mut self) {
        self.inner.lock_epoch().unmount();
        self.task.abort();
        tracing::debug!(policy = %self.inner.policy, "Access gate unmounted");
    }
}
