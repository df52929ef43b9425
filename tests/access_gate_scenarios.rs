//! End-to-end scenarios for the access gate, driven through the in-memory
//! session provider and profile store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use portal_gate::adapters::{InMemoryProfileRepository, MockSessionProvider};
use portal_gate::application::AccessGate;
use portal_gate::domain::foundation::{
    AuthError, AuthenticatedUser, Credentials, DomainError, Email, Session, StateMachine, UserId,
};
use portal_gate::domain::gate::{DenialReason, GatePhase, GatePolicy, GateState, GateTransition};
use portal_gate::domain::profile::{NewProfile, Profile};
use portal_gate::ports::{InsertOutcome, ProfileRepository};
use proptest::prelude::*;
use tokio::sync::Notify;

// ════════════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════════════

fn session(id: &str, email: &str) -> Session {
    Session::new(
        AuthenticatedUser::new(UserId::new(id).unwrap(), email, None, true),
        format!("token-{}", id),
    )
}

fn session_with_token(id: &str, email: &str, token: &str) -> Session {
    Session::new(
        AuthenticatedUser::new(UserId::new(id).unwrap(), email, None, true),
        token,
    )
}

fn credentials(email: &str, password: &str) -> Credentials {
    Credentials::new(Email::parse(email).unwrap(), password)
}

/// Waits until the gate state satisfies `predicate`.
async fn reach(gate: &AccessGate, predicate: impl FnMut(&GateState) -> bool) -> GateState {
    let mut rx = gate.watch();
    let state = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("gate did not reach expected state")
        .expect("gate dropped")
        .clone();
    state
}

async fn settled(gate: &AccessGate) -> GateState {
    reach(gate, |s| !s.is_pending()).await
}

fn authorized_as(user: &'static str) -> impl FnMut(&GateState) -> bool {
    move |s| s.grants_access() && s.user_id().map(UserId::as_str) == Some(user)
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<GateTransition>) -> Vec<GateTransition> {
    let mut seen = Vec::new();
    while let Ok(transition) = rx.try_recv() {
        seen.push(transition);
    }
    seen
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never became true");
}

/// Profile store whose admin lookup for one email blocks until released.
struct LatchedProfiles {
    inner: InMemoryProfileRepository,
    latched_email: String,
    entered: Notify,
    release: Notify,
    finished: AtomicUsize,
}

impl LatchedProfiles {
    fn new(inner: InMemoryProfileRepository, latched_email: &str) -> Self {
        Self {
            inner,
            latched_email: latched_email.to_string(),
            entered: Notify::new(),
            release: Notify::new(),
            finished: AtomicUsize::new(0),
        }
    }

    fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileRepository for LatchedProfiles {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        self.inner.find_by_user(user_id).await
    }

    async fn insert_if_absent(&self, profile: &NewProfile) -> Result<InsertOutcome, DomainError> {
        self.inner.insert_if_absent(profile).await
    }

    async fn admin_flag_by_email(&self, email: &Email) -> Result<Option<bool>, DomainError> {
        if email.matches(&self.latched_email) {
            self.entered.notify_one();
            self.release.notified().await;
            let flag = self.inner.admin_flag_by_email(email).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            return flag;
        }
        self.inner.admin_flag_by_email(email).await
    }

    async fn has_any_admin(&self) -> Result<bool, DomainError> {
        self.inner.has_any_admin().await
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Mount
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn admin_tree_opens_for_admin_session() {
    let gate = AccessGate::new(
        Arc::new(MockSessionProvider::new().with_session(session("u-1", "boss@example.com"))),
        Arc::new(InMemoryProfileRepository::new().with_admin("u-1", "boss@example.com")),
        GatePolicy::AdminOnly,
    );
    let _handle = gate.mount().unwrap();

    let state = settled(&gate).await;
    assert!(state.grants_access());
}

#[tokio::test]
async fn first_visit_provisions_profile_and_denies() {
    let profiles = Arc::new(InMemoryProfileRepository::new());
    let gate = AccessGate::new(
        Arc::new(MockSessionProvider::new().with_session(session("u-9", "new@example.com"))),
        profiles.clone(),
        GatePolicy::AdminOnly,
    );
    let _handle = gate.mount().unwrap();

    let state = settled(&gate).await;
    assert_eq!(state.denial(), Some(DenialReason::NotAdmin));
    let profile = profiles.get(&UserId::new("u-9").unwrap()).unwrap();
    assert!(!profile.is_admin);
}

#[tokio::test]
async fn first_admin_is_provisioned_and_authorized() {
    let profiles = Arc::new(InMemoryProfileRepository::new().with_first_admin_bootstrap());
    let gate = AccessGate::new(
        Arc::new(MockSessionProvider::new().with_session(session("u-1", "first@example.com"))),
        profiles.clone(),
        GatePolicy::AdminOnly,
    );
    let mut transitions = gate.transitions();
    let _handle = gate.mount().unwrap();

    reach(&gate, authorized_as("u-1")).await;

    assert_eq!(
        drain(&mut transitions),
        vec![
            GateTransition { from: GatePhase::Initial, to: GatePhase::Loading },
            GateTransition { from: GatePhase::Loading, to: GatePhase::CheckingAuthorization },
            GateTransition { from: GatePhase::CheckingAuthorization, to: GatePhase::Authorized },
        ]
    );
    assert_eq!(profiles.insert_calls(), 1);
    assert!(profiles.get(&UserId::new("u-1").unwrap()).unwrap().is_admin);
}

#[tokio::test]
async fn unreachable_profile_store_fails_closed() {
    let gate = AccessGate::new(
        Arc::new(MockSessionProvider::new().with_session(session("u-1", "boss@example.com"))),
        Arc::new(
            InMemoryProfileRepository::new()
                .with_admin("u-1", "boss@example.com")
                .with_read_error(DomainError::external("connection refused")),
        ),
        GatePolicy::AdminOnly,
    );
    let _handle = gate.mount().unwrap();

    let state = settled(&gate).await;
    assert!(!state.grants_access());
    assert_eq!(state.denial(), Some(DenialReason::LookupFailed));
}

#[tokio::test]
async fn session_fetch_error_shows_sign_in() {
    let gate = AccessGate::new(
        Arc::new(MockSessionProvider::new().with_error(AuthError::service_unavailable("down"))),
        Arc::new(InMemoryProfileRepository::new()),
        GatePolicy::SignedIn,
    );
    let _handle = gate.mount().unwrap();

    assert_eq!(settled(&gate).await.phase(), GatePhase::Unauthenticated);
}

// ════════════════════════════════════════════════════════════════════════════
// Pushed session changes
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn pushed_sign_in_and_sign_out_are_followed() {
    let sessions = Arc::new(MockSessionProvider::new());
    let gate = AccessGate::new(
        sessions.clone(),
        Arc::new(InMemoryProfileRepository::new().with_admin("u-1", "boss@example.com")),
        GatePolicy::AdminOnly,
    );
    let _handle = gate.mount().unwrap();
    assert_eq!(settled(&gate).await.phase(), GatePhase::Unauthenticated);

    sessions.emit_signed_in(session("u-1", "boss@example.com"));
    reach(&gate, authorized_as("u-1")).await;

    sessions.emit_signed_out();
    let state = reach(&gate, |s| s.phase() == GatePhase::Unauthenticated).await;
    assert!(state.session().is_none());
}

#[tokio::test]
async fn repeated_change_for_same_user_does_not_recheck() {
    let sessions = Arc::new(MockSessionProvider::new().with_session(session("u-1", "boss@example.com")));
    let profiles = Arc::new(InMemoryProfileRepository::new().with_admin("u-1", "boss@example.com"));
    let gate = AccessGate::new(sessions.clone(), profiles.clone(), GatePolicy::AdminOnly);
    let _handle = gate.mount().unwrap();
    settled(&gate).await;
    let reads = profiles.read_calls();
    let mut transitions = gate.transitions();

    // Same session pushed again
    sessions.emit_signed_in(session("u-1", "boss@example.com"));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(drain(&mut transitions).is_empty());
    assert_eq!(profiles.read_calls(), reads);
    assert!(gate.state().grants_access());
}

#[tokio::test]
async fn renewed_session_after_failed_lookup_rechecks() {
    let sessions = Arc::new(MockSessionProvider::new().with_session(session("u-1", "boss@example.com")));
    let profiles = Arc::new(
        InMemoryProfileRepository::new()
            .with_admin("u-1", "boss@example.com")
            .with_read_error(DomainError::external("connection refused")),
    );
    let gate = AccessGate::new(sessions.clone(), profiles.clone(), GatePolicy::AdminOnly);
    let _handle = gate.mount().unwrap();
    assert_eq!(settled(&gate).await.denial(), Some(DenialReason::LookupFailed));

    profiles.clear_errors();
    sessions.emit_signed_in(session_with_token("u-1", "boss@example.com", "token-renewed"));

    let state = reach(&gate, authorized_as("u-1")).await;
    assert_eq!(state.session().map(Session::access_token), Some("token-renewed"));
}

#[tokio::test]
async fn refreshed_token_after_promotion_grants_access() {
    let sessions = Arc::new(MockSessionProvider::new().with_session(session("u-1", "boss@example.com")));
    let profiles = Arc::new(InMemoryProfileRepository::new().with_member("u-1", "boss@example.com"));
    let gate = AccessGate::new(sessions.clone(), profiles.clone(), GatePolicy::AdminOnly);
    let _handle = gate.mount().unwrap();
    assert_eq!(settled(&gate).await.denial(), Some(DenialReason::NotAdmin));

    assert!(profiles.set_admin(&UserId::new("u-1").unwrap(), true));
    sessions.emit_signed_in(session_with_token("u-1", "boss@example.com", "token-refreshed"));

    reach(&gate, authorized_as("u-1")).await;
}

#[tokio::test]
async fn switching_user_rechecks_access() {
    let sessions = Arc::new(MockSessionProvider::new().with_session(session("u-1", "boss@example.com")));
    let gate = AccessGate::new(
        sessions.clone(),
        Arc::new(InMemoryProfileRepository::new().with_admin("u-1", "boss@example.com")),
        GatePolicy::AdminOnly,
    );
    let _handle = gate.mount().unwrap();
    reach(&gate, authorized_as("u-1")).await;

    sessions.emit_signed_in(session("u-2", "member@example.com"));

    let state = reach(&gate, |s| s.phase() == GatePhase::Unauthorized).await;
    assert_eq!(state.user_id().map(UserId::as_str), Some("u-2"));
}

// ════════════════════════════════════════════════════════════════════════════
// User actions
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn sign_in_passes_through_loading() {
    let sessions = Arc::new(
        MockSessionProvider::new().with_account("boss@example.com", "hunter22", session("u-1", "boss@example.com")),
    );
    let gate = AccessGate::new(
        sessions.clone(),
        Arc::new(InMemoryProfileRepository::new().with_admin("u-1", "boss@example.com")),
        GatePolicy::AdminOnly,
    );
    let _handle = gate.mount().unwrap();
    settled(&gate).await;
    let mut transitions = gate.transitions();

    gate.sign_in(&credentials("boss@example.com", "hunter22")).await.unwrap();

    assert!(gate.state().grants_access());
    assert!(drain(&mut transitions).contains(&GateTransition {
        from: GatePhase::Unauthenticated,
        to: GatePhase::Loading,
    }));
    assert_eq!(sessions.sign_in_calls(), 1);
}

#[tokio::test]
async fn rejected_sign_in_keeps_sign_in_form() {
    let gate = AccessGate::new(
        Arc::new(MockSessionProvider::new()),
        Arc::new(InMemoryProfileRepository::new()),
        GatePolicy::AdminOnly,
    );
    let _handle = gate.mount().unwrap();
    settled(&gate).await;

    let result = gate.sign_in(&credentials("boss@example.com", "wrong-pass")).await;

    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    assert_eq!(gate.state().phase(), GatePhase::Unauthenticated);
}

#[tokio::test]
async fn failed_sign_out_leaves_state_unchanged() {
    let gate = AccessGate::new(
        Arc::new(
            MockSessionProvider::new()
                .with_session(session("u-1", "boss@example.com"))
                .with_sign_out_error(AuthError::service_unavailable("down")),
        ),
        Arc::new(InMemoryProfileRepository::new().with_admin("u-1", "boss@example.com")),
        GatePolicy::AdminOnly,
    );
    let _handle = gate.mount().unwrap();
    settled(&gate).await;

    assert!(gate.sign_out().await.is_err());
    assert!(gate.state().grants_access());
}

#[tokio::test]
async fn sign_out_returns_to_sign_in_form() {
    let gate = AccessGate::new(
        Arc::new(MockSessionProvider::new().with_session(session("c-1", "client@example.com"))),
        Arc::new(InMemoryProfileRepository::new()),
        GatePolicy::SignedIn,
    );
    let _handle = gate.mount().unwrap();
    settled(&gate).await;

    gate.sign_out().await.unwrap();

    assert_eq!(gate.state().phase(), GatePhase::Unauthenticated);
}

#[tokio::test]
async fn sign_out_from_access_denied_view() {
    let gate = AccessGate::new(
        Arc::new(MockSessionProvider::new().with_session(session("u-2", "member@example.com"))),
        Arc::new(InMemoryProfileRepository::new().with_member("u-2", "member@example.com")),
        GatePolicy::AdminOnly,
    );
    let _handle = gate.mount().unwrap();
    assert_eq!(settled(&gate).await.phase(), GatePhase::Unauthorized);

    gate.sign_out().await.unwrap();

    let state = gate.state();
    assert_eq!(state.phase(), GatePhase::Unauthenticated);
    assert!(state.session().is_none());
}

#[tokio::test]
async fn reload_picks_up_granted_admin_flag() {
    let profiles = Arc::new(InMemoryProfileRepository::new().with_member("u-1", "boss@example.com"));
    let gate = AccessGate::new(
        Arc::new(MockSessionProvider::new().with_session(session("u-1", "boss@example.com"))),
        profiles.clone(),
        GatePolicy::AdminOnly,
    );
    let _handle = gate.mount().unwrap();
    assert_eq!(settled(&gate).await.denial(), Some(DenialReason::NotAdmin));

    assert!(profiles.set_admin(&UserId::new("u-1").unwrap(), true));
    gate.reload().await;

    assert!(gate.state().grants_access());
}

// ════════════════════════════════════════════════════════════════════════════
// Staleness and unmount
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn slow_lookup_for_previous_user_is_discarded() {
    let store = InMemoryProfileRepository::new()
        .with_member("u-a", "slow@example.com")
        .with_admin("u-b", "fast@example.com");
    let profiles = Arc::new(LatchedProfiles::new(store, "slow@example.com"));
    let sessions = Arc::new(MockSessionProvider::new());
    let gate = AccessGate::new(sessions.clone(), profiles.clone(), GatePolicy::AdminOnly);
    let _handle = gate.mount().unwrap();
    settled(&gate).await;

    sessions.emit_signed_in(session("u-a", "slow@example.com"));
    profiles.entered.notified().await;
    sessions.emit_signed_in(session("u-b", "fast@example.com"));
    reach(&gate, authorized_as("u-b")).await;

    profiles.release.notify_one();
    eventually(|| profiles.finished() == 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let state = gate.state();
    assert!(state.grants_access());
    assert_eq!(state.user_id().map(UserId::as_str), Some("u-b"));
}

#[tokio::test]
async fn unmount_discards_in_flight_result_and_unsubscribes() {
    let store = InMemoryProfileRepository::new().with_admin("u-a", "slow@example.com");
    let profiles = Arc::new(LatchedProfiles::new(store, "slow@example.com"));
    let sessions = Arc::new(MockSessionProvider::new().with_session(session("u-a", "slow@example.com")));
    let gate = AccessGate::new(sessions.clone(), profiles.clone(), GatePolicy::AdminOnly);
    let handle = gate.mount().unwrap();

    profiles.entered.notified().await;
    assert_eq!(gate.state().phase(), GatePhase::CheckingAuthorization);
    handle.unmount();

    profiles.release.notify_one();
    eventually(|| profiles.finished() == 1).await;
    eventually(|| sessions.subscriber_count() == 0).await;

    assert_eq!(gate.state().phase(), GatePhase::CheckingAuthorization);
    sessions.emit_signed_out();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(gate.state().phase(), GatePhase::CheckingAuthorization);
}

// ════════════════════════════════════════════════════════════════════════════
// Transition log
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn observed_transitions_form_a_valid_chain() {
    let sessions = Arc::new(MockSessionProvider::new().with_account(
        "boss@example.com",
        "hunter22",
        session("u-1", "boss@example.com"),
    ));
    let gate = AccessGate::new(
        sessions.clone(),
        Arc::new(InMemoryProfileRepository::new().with_admin("u-1", "boss@example.com")),
        GatePolicy::AdminOnly,
    );
    let mut transitions = gate.transitions();
    let _handle = gate.mount().unwrap();
    settled(&gate).await;

    gate.sign_in(&credentials("boss@example.com", "hunter22")).await.unwrap();
    sessions.emit_signed_in(session("u-2", "member@example.com"));
    reach(&gate, |s| s.phase() == GatePhase::Unauthorized).await;
    gate.sign_out().await.unwrap();
    gate.reload().await;

    let seen = drain(&mut transitions);
    assert_eq!(seen.first().map(|t| t.from), Some(GatePhase::Initial));
    for pair in seen.windows(2) {
        assert_eq!(pair[0].to, pair[1].from);
    }
    for transition in &seen {
        assert!(transition.from.can_transition_to(&transition.to));
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Properties
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
enum Event {
    Admin,
    Member,
    SignedOut,
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![Just(Event::Admin), Just(Event::Member), Just(Event::SignedOut)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn gate_settles_on_latest_pushed_session(events in prop::collection::vec(event(), 1..10)) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let sessions = Arc::new(MockSessionProvider::new());
            let gate = AccessGate::new(
                sessions.clone(),
                Arc::new(
                    InMemoryProfileRepository::new()
                        .with_admin("admin", "admin@example.com")
                        .with_member("member", "member@example.com"),
                ),
                GatePolicy::AdminOnly,
            );
            let _handle = gate.mount().unwrap();

            for event in &events {
                match event {
                    Event::Admin => sessions.emit_signed_in(session("admin", "admin@example.com")),
                    Event::Member => sessions.emit_signed_in(session("member", "member@example.com")),
                    Event::SignedOut => sessions.emit_signed_out(),
                }
            }

            let last = *events.last().unwrap();
            let state = reach(&gate, move |s| match last {
                Event::Admin => s.grants_access() && s.user_id().map(UserId::as_str) == Some("admin"),
                Event::Member => s.phase() == GatePhase::Unauthorized
                    && s.user_id().map(UserId::as_str) == Some("member"),
                Event::SignedOut => s.phase() == GatePhase::Unauthenticated,
            })
            .await;

            // Only an admin session ever opens the admin tree.
            assert_eq!(state.grants_access(), matches!(last, Event::Admin));

            // Results of superseded flows must not land afterwards.
            tokio::time::sleep(Duration::from_millis(20)).await;
            let later = gate.state();
            assert_eq!(later.phase(), state.phase());
            assert_eq!(later.user_id(), state.user_id());
        });
    }
}
