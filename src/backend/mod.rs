//! External service boundary.
//!
//! DESIGN
//! ======
//! The session coordinator only ever talks to [`AuthBackend`]. Two
//! implementations exist: [`supabase::SupabaseBackend`] for the hosted
//! service and [`demo::DemoBackend`], an in-process stand-in used by tests
//! and the CLI's offline mode. Data pages (catalog, chat) use the shared
//! [`rest::RestClient`] directly; they are not coordinated through the trait.

pub mod demo;
pub mod query;
pub mod rest;
pub mod supabase;
pub mod types;

pub use types::{
    AuthEvent, BackendError, Identifier, Identity, PaymentStatus, Profile, ProfilePatch, SignUpRequest, UserType,
};

use crate::realtime::Subscription;

/// Auth operations the session coordinator delegates to.
///
/// Implementations verify credentials and own the session tokens; callers
/// never inspect tokens, they re-read [`AuthBackend::current_identity`].
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    /// Verify credentials and start a session.
    async fn sign_in(&self, identifier: &Identifier, password: &str) -> Result<(), BackendError>;

    /// Create an account (auth record + profile row) and start its session
    /// when the service issues one immediately.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), BackendError>;

    /// End the session. Local tokens are dropped even when the call fails.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Fetch the current auth record and its profile. `None` when there is
    /// no valid session.
    async fn current_identity(&self) -> Result<Option<Identity>, BackendError>;

    /// Patch profile fields of `user_id`.
    async fn update_profile(&self, user_id: &str, patch: &ProfilePatch) -> Result<(), BackendError>;

    /// Open the auth-state change stream. Must be called inside a Tokio runtime.
    fn auth_events(&self) -> Subscription<AuthEvent>;
}
