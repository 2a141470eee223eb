use super::*;
use crate::backend::demo::DemoBackend;
use crate::backend::{PaymentStatus, UserType};
use crate::realtime::Subscription;
use tokio::sync::Notify;
use tokio::time::{Duration, timeout};

fn registration(email: &str, user_type: UserType) -> SignUpRequest {
    SignUpRequest {
        email: email.into(),
        password: "secret1".into(),
        phone: "+221 77 000 00 00".into(),
        username: "awa".into(),
        full_name: "Awa Diop".into(),
        user_type,
        country: "SN".into(),
        city: "Dakar".into(),
        address: "Plateau".into(),
        payment_reference: None,
    }
}

async fn started() -> (Arc<DemoBackend>, SessionCoordinator) {
    let backend = Arc::new(DemoBackend::new());
    let coordinator = SessionCoordinator::start(backend.clone() as Arc<dyn AuthBackend>).await;
    (backend, coordinator)
}

async fn wait_for<F>(rx: &mut watch::Receiver<SessionState>, pred: F) -> SessionState
where
    F: Fn(&SessionState) -> bool,
{
    timeout(Duration::from_millis(500), async {
        loop {
            let current = rx.borrow_and_update().clone();
            if pred(&current) {
                return current;
            }
            rx.changed().await.expect("coordinator dropped");
        }
    })
    .await
    .expect("state change timed out")
}

// =============================================================================
// GatedBackend: holds sign-in open until released
// =============================================================================

struct GatedBackend {
    inner: DemoBackend,
    entered: Notify,
    release: Notify,
}

#[async_trait::async_trait]
impl AuthBackend for GatedBackend {
    async fn sign_in(&self, identifier: &Identifier, password: &str) -> Result<(), BackendError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.sign_in(identifier, password).await
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), BackendError> {
        self.inner.sign_up(request).await
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.inner.sign_out().await
    }

    async fn current_identity(&self) -> Result<Option<Identity>, BackendError> {
        self.inner.current_identity().await
    }

    async fn update_profile(&self, user_id: &str, patch: &ProfilePatch) -> Result<(), BackendError> {
        self.inner.update_profile(user_id, patch).await
    }

    fn auth_events(&self) -> Subscription<AuthEvent> {
        self.inner.auth_events()
    }
}

// =============================================================================
// SlowBackend: identity fetches take a few milliseconds
// =============================================================================

struct SlowBackend {
    inner: DemoBackend,
}

#[async_trait::async_trait]
impl AuthBackend for SlowBackend {
    async fn sign_in(&self, identifier: &Identifier, password: &str) -> Result<(), BackendError> {
        self.inner.sign_in(identifier, password).await
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), BackendError> {
        self.inner.sign_up(request).await
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.inner.sign_out().await
    }

    async fn current_identity(&self) -> Result<Option<Identity>, BackendError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.inner.current_identity().await
    }

    async fn update_profile(&self, user_id: &str, patch: &ProfilePatch) -> Result<(), BackendError> {
        self.inner.update_profile(user_id, patch).await
    }

    fn auth_events(&self) -> Subscription<AuthEvent> {
        self.inner.auth_events()
    }
}

// =============================================================================
// start
// =============================================================================

#[tokio::test]
async fn starts_anonymous_without_session() {
    let (_backend, coordinator) = started().await;
    assert_eq!(coordinator.current(), SessionState::Anonymous);
}

#[tokio::test]
async fn starts_authenticated_when_backend_has_session() {
    let backend = Arc::new(DemoBackend::new());
    backend.sign_up(&registration("a@x.com", UserType::Simple)).await.unwrap();
    let coordinator = SessionCoordinator::start(backend.clone() as Arc<dyn AuthBackend>).await;
    assert!(coordinator.current().is_authenticated());
}

#[tokio::test]
async fn start_with_unreachable_backend_is_anonymous() {
    let backend = Arc::new(DemoBackend::new());
    backend.set_offline(true);
    let coordinator = SessionCoordinator::start(backend.clone() as Arc<dyn AuthBackend>).await;
    assert_eq!(coordinator.current(), SessionState::Anonymous);
}

// =============================================================================
// sign_in / sign_up / sign_out
// =============================================================================

#[tokio::test]
async fn sign_in_publishes_backend_identity() {
    let (backend, coordinator) = started().await;
    backend.sign_up(&registration("a@x.com", UserType::Simple)).await.unwrap();
    backend.sign_out().await.unwrap();

    let state = coordinator.sign_in("a@x.com", "secret1").await.unwrap();
    let backend_id = backend.current_identity().await.unwrap().unwrap().id;
    assert_eq!(state.user_id(), Some(backend_id.as_str()));
    assert_eq!(coordinator.current().user_id(), Some(backend_id.as_str()));
}

#[tokio::test]
async fn failed_sign_in_keeps_prior_session() {
    let (_backend, coordinator) = started().await;
    coordinator
        .sign_up(&registration("a@x.com", UserType::Simple))
        .await
        .unwrap();
    let before = coordinator.current();

    let err = coordinator.sign_in("a@x.com", "wrong").await.unwrap_err();
    assert!(matches!(err, BackendError::InvalidCredentials(_)));
    assert_eq!(coordinator.current(), before);
}

#[tokio::test]
async fn sign_in_network_failure_propagates() {
    let (backend, coordinator) = started().await;
    backend.set_offline(true);
    let err = coordinator.sign_in("a@x.com", "secret1").await.unwrap_err();
    assert!(matches!(err, BackendError::Network(_)));
    assert_eq!(err.display_message(), crate::backend::types::GENERIC_FAILURE_MESSAGE);
}

#[tokio::test]
async fn blank_sign_in_is_rejected_before_backend() {
    let (backend, coordinator) = started().await;
    let fetches = backend.identity_fetches();
    let err = coordinator.sign_in("   ", "secret1").await.unwrap_err();
    assert_eq!(err, BackendError::Rejected(crate::registration::MISSING_FIELDS.into()));
    let err = coordinator.sign_in("a@x.com", "").await.unwrap_err();
    assert!(matches!(err, BackendError::Rejected(_)));
    assert_eq!(backend.identity_fetches(), fetches);
}

#[tokio::test]
async fn sign_up_simple_publishes_simple_identity() {
    let (_backend, coordinator) = started().await;
    let state = coordinator
        .sign_up(&registration("a@x.com", UserType::Simple))
        .await
        .unwrap();
    let identity = state.identity().unwrap();
    assert_eq!(identity.user_type(), UserType::Simple);
    assert_eq!(identity.profile.as_ref().unwrap().country.as_deref(), Some("SN"));
}

#[tokio::test]
async fn sign_up_supplier_without_payment_stays_gated() {
    let (_backend, coordinator) = started().await;
    let state = coordinator
        .sign_up(&registration("s@x.com", UserType::Supplier))
        .await
        .unwrap();
    let identity = state.identity().unwrap();
    assert!(identity.is_supplier());
    assert_ne!(identity.payment_status(), PaymentStatus::Paid);
    assert!(!identity.supplier_features_enabled());
}

#[tokio::test]
async fn sign_out_publishes_anonymous() {
    let (_backend, coordinator) = started().await;
    coordinator
        .sign_up(&registration("a@x.com", UserType::Simple))
        .await
        .unwrap();
    coordinator.sign_out().await.unwrap();
    assert_eq!(coordinator.current(), SessionState::Anonymous);

    // Signing out while anonymous is still anonymous.
    coordinator.sign_out().await.unwrap();
    assert_eq!(coordinator.current(), SessionState::Anonymous);
}

#[tokio::test]
async fn sign_out_failure_still_publishes_anonymous() {
    let (backend, coordinator) = started().await;
    coordinator
        .sign_up(&registration("a@x.com", UserType::Simple))
        .await
        .unwrap();
    backend.set_offline(true);
    let err = coordinator.sign_out().await.unwrap_err();
    assert!(matches!(err, BackendError::Network(_)));
    assert_eq!(coordinator.current(), SessionState::Anonymous);
}

// =============================================================================
// refresh_user / update_profile
// =============================================================================

#[tokio::test]
async fn refresh_twice_yields_equal_identities() {
    let (backend, coordinator) = started().await;
    coordinator
        .sign_up(&registration("a@x.com", UserType::Simple))
        .await
        .unwrap();
    let before = backend.identity_fetches();
    let first = coordinator.refresh_user().await;
    let second = coordinator.refresh_user().await;
    assert!(first.is_authenticated());
    assert_eq!(first, second);
    assert!(backend.identity_fetches() >= before + 2);
}

#[tokio::test]
async fn failed_refresh_publishes_anonymous() {
    let (backend, coordinator) = started().await;
    coordinator
        .sign_up(&registration("a@x.com", UserType::Simple))
        .await
        .unwrap();
    backend.set_offline(true);
    assert_eq!(coordinator.refresh_user().await, SessionState::Anonymous);
    assert_eq!(coordinator.current(), SessionState::Anonymous);
}

#[tokio::test]
async fn update_profile_refreshes_identity() {
    let (_backend, coordinator) = started().await;
    coordinator
        .sign_up(&registration("a@x.com", UserType::Simple))
        .await
        .unwrap();
    let patch = ProfilePatch { city: Some("Thiès".into()), ..ProfilePatch::default() };
    let state = coordinator.update_profile(&patch).await.unwrap();
    let city = state.identity().and_then(|i| i.profile.as_ref()).and_then(|p| p.city.clone());
    assert_eq!(city.as_deref(), Some("Thiès"));
}

#[tokio::test]
async fn update_profile_when_anonymous_fails() {
    let (_backend, coordinator) = started().await;
    let err = coordinator
        .update_profile(&ProfilePatch::default())
        .await
        .unwrap_err();
    assert_eq!(err, BackendError::NotAuthenticated);
}

// =============================================================================
// auth events
// =============================================================================

#[tokio::test]
async fn revoked_elsewhere_publishes_anonymous() {
    let (backend, coordinator) = started().await;
    coordinator
        .sign_up(&registration("a@x.com", UserType::Simple))
        .await
        .unwrap();
    let mut rx = coordinator.subscribe();

    backend.revoke_session();
    let state = wait_for(&mut rx, |s| !s.is_authenticated()).await;
    assert_eq!(state, SessionState::Anonymous);
}

#[tokio::test]
async fn external_sign_in_is_picked_up() {
    let (backend, coordinator) = started().await;
    let mut rx = coordinator.subscribe();
    backend.sign_up(&registration("a@x.com", UserType::Simple)).await.unwrap();
    let state = wait_for(&mut rx, SessionState::is_authenticated).await;
    assert_eq!(state.identity().unwrap().email.as_deref(), Some("a@x.com"));
}

#[tokio::test]
async fn payment_confirmation_unlocks_supplier_features() {
    let (backend, coordinator) = started().await;
    let state = coordinator
        .sign_up(&registration("s@x.com", UserType::Supplier))
        .await
        .unwrap();
    let id = state.user_id().unwrap().to_owned();
    let mut rx = coordinator.subscribe();

    assert!(backend.confirm_payment(&id));
    let state = wait_for(&mut rx, |s| s.identity().is_some_and(Identity::supplier_features_enabled)).await;
    assert_eq!(state.user_id(), Some(id.as_str()));
}

#[tokio::test]
async fn subscribers_see_sign_out() {
    let (_backend, coordinator) = started().await;
    coordinator
        .sign_up(&registration("a@x.com", UserType::Simple))
        .await
        .unwrap();
    let mut a = coordinator.subscribe();
    let mut b = coordinator.subscribe();
    coordinator.sign_out().await.unwrap();
    assert_eq!(wait_for(&mut a, |s| !s.is_authenticated()).await, SessionState::Anonymous);
    assert_eq!(wait_for(&mut b, |s| !s.is_authenticated()).await, SessionState::Anonymous);
}

// =============================================================================
// ordering + teardown
// =============================================================================

#[tokio::test]
async fn sign_out_issued_during_sign_in_wins() {
    let gated = Arc::new(GatedBackend { inner: DemoBackend::new(), entered: Notify::new(), release: Notify::new() });
    gated
        .inner
        .sign_up(&registration("a@x.com", UserType::Simple))
        .await
        .unwrap();
    gated.inner.sign_out().await.unwrap();

    let coordinator = Arc::new(SessionCoordinator::start(gated.clone() as Arc<dyn AuthBackend>).await);

    let signing_in = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.sign_in("a@x.com", "secret1").await })
    };
    timeout(Duration::from_millis(500), gated.entered.notified())
        .await
        .expect("sign-in never reached backend");

    let signing_out = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.sign_out().await })
    };
    tokio::task::yield_now().await;
    gated.release.notify_one();

    let signed_in = signing_in.await.unwrap().unwrap();
    assert!(signed_in.is_authenticated());
    signing_out.await.unwrap().unwrap();
    assert_eq!(coordinator.current(), SessionState::Anonymous);
}

#[tokio::test]
async fn queued_sign_out_event_does_not_undo_later_sign_in() {
    let slow = Arc::new(SlowBackend { inner: DemoBackend::new() });
    let coordinator = SessionCoordinator::start(slow.clone() as Arc<dyn AuthBackend>).await;
    coordinator
        .sign_up(&registration("a@x.com", UserType::Simple))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    coordinator.sign_out().await.unwrap();
    let state = coordinator.sign_in("a@x.com", "secret1").await.unwrap();
    assert!(state.is_authenticated());

    for _ in 0..40 {
        assert!(coordinator.current().is_authenticated(), "stale sign-out event was applied");
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test]
async fn dispose_releases_backend() {
    let (backend, coordinator) = started().await;
    assert!(Arc::strong_count(&backend) > 1);
    coordinator.dispose();
    timeout(Duration::from_millis(500), async {
        while Arc::strong_count(&backend) > 1 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("listener should release the backend");
}
