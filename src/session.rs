//! Session coordinator, the single source of truth for "who is logged in".
//!
//! ARCHITECTURE
//! ============
//! The published [`SessionState`] lives in a `watch` channel. The coordinator
//! is its only writer; every consumer holds a receiver. Each write publishes
//! an identity fetched fresh from the backend, never a locally edited copy.
//!
//! One background task listens to the backend's auth-state events for the
//! coordinator's whole lifetime and re-syncs on each of them. Dropping the
//! coordinator aborts that task and with it the subscription.
//!
//! ORDERING
//! ========
//! Operations that publish (sign-in, sign-up, sign-out, refresh, event
//! re-syncs) run one at a time behind a FIFO async lock, so they publish in
//! the order they were issued. A sign-out issued while a sign-in is still in
//! flight therefore wins.
//!
//! FAILURES
//! ========
//! Sign-in/sign-up/sign-out errors are returned to the caller untouched and
//! nothing is retried. A failed refresh is the one exception: it publishes
//! `Anonymous` instead of keeping a possibly stale identity.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::backend::{AuthBackend, AuthEvent, BackendError, Identifier, Identity, ProfilePatch, SignUpRequest};

/// Published authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Identity),
}

impl SessionState {
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(identity) => Some(identity),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.identity().map(|i| i.id.as_str())
    }
}

impl From<Option<Identity>> for SessionState {
    fn from(identity: Option<Identity>) -> Self {
        identity.map_or(Self::Anonymous, Self::Authenticated)
    }
}

struct Inner {
    backend: Arc<dyn AuthBackend>,
    state: watch::Sender<SessionState>,
    /// Serializes every publishing operation.
    op_lock: Mutex<()>,
}

impl Inner {
    fn publish(&self, next: SessionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            match &next {
                SessionState::Authenticated(identity) => {
                    tracing::info!(user_id = %identity.id, "session authenticated");
                }
                SessionState::Anonymous => tracing::info!("session anonymous"),
            }
            *current = next;
            true
        });
    }

    /// Fetch and publish; fetch failures publish `Anonymous`.
    async fn resync(&self) -> SessionState {
        let next = match self.backend.current_identity().await {
            Ok(identity) => SessionState::from(identity),
            Err(e) => {
                tracing::warn!(error = %e, "identity refresh failed; treating as signed out");
                SessionState::Anonymous
            }
        };
        self.publish(next.clone());
        next
    }

    /// Events can be stale by the time they are handled: one emitted during
    /// an earlier operation may arrive after a later one published. The
    /// backend's current view is always fetched instead of trusting the
    /// event kind.
    async fn on_event(&self, event: AuthEvent) {
        let _guard = self.op_lock.lock().await;
        tracing::debug!(?event, ends_session = event.ends_session(), "auth state changed");
        self.resync().await;
    }
}

pub struct SessionCoordinator {
    inner: Arc<Inner>,
    listener: JoinHandle<()>,
}

impl SessionCoordinator {
    /// Subscribe to auth events, load the initial session and start the
    /// listener. A failed initial load starts `Anonymous`.
    pub async fn start(backend: Arc<dyn AuthBackend>) -> Self {
        let mut events = backend.auth_events();
        let (state, _) = watch::channel(SessionState::Anonymous);
        let inner = Arc::new(Inner { backend, state, op_lock: Mutex::new(()) });

        {
            let _guard = inner.op_lock.lock().await;
            inner.resync().await;
        }

        let listener_inner = Arc::clone(&inner);
        let listener = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                listener_inner.on_event(event).await;
            }
            tracing::debug!("auth event stream ended");
        });

        Self { inner, listener }
    }

    /// Current published state.
    #[must_use]
    pub fn current(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver for state changes. The current value is marked seen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Sign in with an email, phone number or username.
    ///
    /// # Errors
    ///
    /// [`BackendError::Rejected`] for blank input,
    /// [`BackendError::InvalidCredentials`] for refused credentials, any
    /// backend failure otherwise. The published state is left untouched on
    /// error.
    pub async fn sign_in(&self, identifier: &str, password: &str) -> Result<SessionState, BackendError> {
        let identifier = Identifier::parse(identifier)
            .filter(|_| !password.is_empty())
            .ok_or_else(|| BackendError::Rejected(crate::registration::MISSING_FIELDS.into()))?;

        tracing::debug!(kind = identifier.label(), "sign-in requested");
        let _guard = self.inner.op_lock.lock().await;
        self.inner.backend.sign_in(&identifier, password).await?;
        let next = SessionState::from(self.inner.backend.current_identity().await?);
        self.inner.publish(next.clone());
        Ok(next)
    }

    /// Create an account and publish the resulting session.
    ///
    /// # Errors
    ///
    /// Any backend failure; the published state is left untouched.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<SessionState, BackendError> {
        let _guard = self.inner.op_lock.lock().await;
        self.inner.backend.sign_up(request).await?;
        let next = SessionState::from(self.inner.backend.current_identity().await?);
        self.inner.publish(next.clone());
        Ok(next)
    }

    /// End the session. `Anonymous` is published even if the backend call
    /// fails; the failure is still returned.
    ///
    /// # Errors
    ///
    /// The backend's sign-out failure.
    pub async fn sign_out(&self) -> Result<(), BackendError> {
        let _guard = self.inner.op_lock.lock().await;
        let result = self.inner.backend.sign_out().await;
        self.inner.publish(SessionState::Anonymous);
        result
    }

    /// Re-fetch the identity without touching credentials.
    pub async fn refresh_user(&self) -> SessionState {
        let _guard = self.inner.op_lock.lock().await;
        self.inner.resync().await
    }

    /// Patch the signed-in user's profile, then refresh.
    ///
    /// # Errors
    ///
    /// [`BackendError::NotAuthenticated`] when anonymous; the backend's
    /// update failure otherwise.
    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<SessionState, BackendError> {
        let user_id = self
            .current()
            .user_id()
            .map(str::to_owned)
            .ok_or(BackendError::NotAuthenticated)?;
        self.inner.backend.update_profile(&user_id, patch).await?;
        Ok(self.refresh_user().await)
    }

    /// Stop listening for auth events.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
