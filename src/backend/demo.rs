//! In-process backend for tests and offline demos.
//!
//! Accounts live in memory, ids are prefixed with `demo_`. The hooks at the
//! bottom simulate what the hosted service does on its own: outages, a
//! session revoked from another device, a supplier payment being confirmed.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::broadcast;

use super::types::{
    AuthEvent, BackendError, INVALID_CREDENTIALS_MESSAGE, Identifier, Identity, PaymentStatus, Profile, ProfilePatch,
    SignUpRequest,
};
use super::AuthBackend;
use crate::realtime::Subscription;

const EVENT_BUFFER: usize = 16;
const OFFLINE_MESSAGE: &str = "service unreachable";

struct Account {
    password: String,
    identity: Identity,
}

#[derive(Default)]
struct DemoState {
    /// Accounts keyed by user id.
    accounts: HashMap<String, Account>,
    current: Option<String>,
}

pub struct DemoBackend {
    state: Mutex<DemoState>,
    events: broadcast::Sender<AuthEvent>,
    offline: AtomicBool,
    identity_fetches: AtomicUsize,
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoBackend {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            state: Mutex::new(DemoState::default()),
            events,
            offline: AtomicBool::new(false),
            identity_fetches: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DemoState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Network(OFFLINE_MESSAGE.into()));
        }
        Ok(())
    }

    /// Make every following call fail with a network error (or recover).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Drop the session as if it had been revoked elsewhere.
    pub fn revoke_session(&self) {
        self.lock().current = None;
        self.emit(AuthEvent::SessionExpired);
    }

    /// Confirm a supplier's fee, as the back office would.
    pub fn confirm_payment(&self, user_id: &str) -> bool {
        let mut state = self.lock();
        let Some(profile) = state
            .accounts
            .get_mut(user_id)
            .and_then(|a| a.identity.profile.as_mut())
        else {
            return false;
        };
        profile.payment_status = PaymentStatus::Paid;
        profile.updated_at = Some(now_rfc3339());
        drop(state);
        self.emit(AuthEvent::UserUpdated);
        true
    }

    /// Number of `current_identity` calls served so far.
    #[must_use]
    pub fn identity_fetches(&self) -> usize {
        self.identity_fetches.load(Ordering::SeqCst)
    }

    /// Register an account without signing it in. Returns the new user id.
    ///
    /// # Errors
    ///
    /// [`BackendError::Rejected`] when the email is already registered.
    pub fn add_account(&self, request: &SignUpRequest, payment_status: PaymentStatus) -> Result<String, BackendError> {
        self.insert_account(request, payment_status)
    }

    fn insert_account(&self, request: &SignUpRequest, payment_status: PaymentStatus) -> Result<String, BackendError> {
        let email = request.email.trim().to_ascii_lowercase();
        let mut state = self.lock();
        if Self::find_account(&state, &Identifier::Email(email.clone())).is_some() {
            return Err(BackendError::Rejected("User already registered".into()));
        }

        let id = format!("demo_{}", uuid::Uuid::new_v4().simple());
        let now = now_rfc3339();
        let payment_reference = request
            .payment_reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_owned);
        let profile = Profile {
            id: id.clone(),
            email: Some(email.clone()),
            username: Some(request.username.trim().to_owned()),
            full_name: Some(request.full_name.trim().to_owned()),
            phone: Some(request.phone.trim().to_owned()),
            address: Some(request.address.trim().to_owned()),
            city: Some(request.city.trim().to_owned()),
            country: Some(request.country.trim().to_owned()),
            user_type: request.user_type,
            payment_status,
            payment_reference,
            created_at: Some(now.clone()),
            updated_at: Some(now),
            ..Profile::default()
        };
        let identity = Identity { id: id.clone(), email: Some(email), profile: Some(profile) };
        state
            .accounts
            .insert(id.clone(), Account { password: request.password.clone(), identity });
        Ok(id)
    }

    fn find_account<'a>(state: &'a DemoState, identifier: &Identifier) -> Option<(&'a String, &'a Account)> {
        state.accounts.iter().find(|(_, account)| {
            let identity = &account.identity;
            let profile = identity.profile.as_ref();
            match identifier {
                Identifier::Email(email) => identity.email.as_deref() == Some(email.as_str()),
                Identifier::Phone(phone) => profile.and_then(|p| p.phone.as_deref()) == Some(phone.as_str()),
                Identifier::Username(name) => profile.and_then(|p| p.username.as_deref()) == Some(name.as_str()),
            }
        })
    }
}

#[async_trait::async_trait]
impl AuthBackend for DemoBackend {
    async fn sign_in(&self, identifier: &Identifier, password: &str) -> Result<(), BackendError> {
        self.check_online()?;
        let mut state = self.lock();
        let user_id = match Self::find_account(&state, identifier) {
            Some((id, account)) if account.password == password => id.clone(),
            _ => return Err(BackendError::InvalidCredentials(INVALID_CREDENTIALS_MESSAGE.into())),
        };
        state.current = Some(user_id);
        drop(state);
        self.emit(AuthEvent::SignedIn);
        Ok(())
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), BackendError> {
        self.check_online()?;
        let id = self.insert_account(request, PaymentStatus::Pending)?;
        self.lock().current = Some(id);
        self.emit(AuthEvent::SignedIn);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let offline = self.check_online();
        self.lock().current = None;
        self.emit(AuthEvent::SignedOut);
        offline
    }

    async fn current_identity(&self) -> Result<Option<Identity>, BackendError> {
        self.identity_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let state = self.lock();
        Ok(state
            .current
            .as_ref()
            .and_then(|id| state.accounts.get(id))
            .map(|a| a.identity.clone()))
    }

    async fn update_profile(&self, user_id: &str, patch: &ProfilePatch) -> Result<(), BackendError> {
        self.check_online()?;
        let mut state = self.lock();
        let profile = state
            .accounts
            .get_mut(user_id)
            .and_then(|a| a.identity.profile.as_mut())
            .ok_or_else(|| BackendError::Rejected(format!("no profile for {user_id}")))?;
        patch.apply_to(profile);
        profile.updated_at = Some(now_rfc3339());
        Ok(())
    }

    fn auth_events(&self) -> Subscription<AuthEvent> {
        Subscription::from_broadcast(self.events.subscribe())
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

#[cfg(test)]
#[path = "demo_test.rs"]
mod tests;
