//! Hosted backend adapter for GoTrue auth and PostgREST profiles.
//!
//! ARCHITECTURE
//! ============
//! The hosted JS SDK keeps the session locally and fires auth-state events
//! when it changes; this adapter does the same. Tokens live in the shared
//! [`RestClient`], and every local session transition is announced on a
//! broadcast channel that [`AuthBackend::auth_events`] subscribes to.
//!
//! Phone and username sign-ins are resolved to the account email through
//! the `profiles` table, since the password grant only accepts email.

use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use super::query::Query;
use super::rest::{self, RestClient, SessionTokens, check_status, parse_json, send};
use super::types::{
    AuthEvent, BackendError, INVALID_CREDENTIALS_MESSAGE, Identifier, Identity, PaymentStatus, Profile, ProfilePatch,
    SignUpRequest,
};
use super::AuthBackend;
use crate::config::BackendConfig;
use crate::realtime::Subscription;

const EVENT_BUFFER: usize = 16;
const PROFILES_TABLE: &str = "profiles";

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

impl TokenResponse {
    fn tokens(&self) -> SessionTokens {
        SessionTokens { access_token: self.access_token.clone(), refresh_token: self.refresh_token.clone() }
    }
}

/// Sign-up either starts a session or waits for email confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    Session(TokenResponse),
    ConfirmationRequired(AuthUser),
}

#[derive(Deserialize)]
struct EmailRow {
    email: Option<String>,
}

// =============================================================================
// BACKEND
// =============================================================================

pub struct SupabaseBackend {
    rest: RestClient,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseBackend {
    /// # Errors
    ///
    /// Returns [`BackendError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        Ok(Self::from_rest(RestClient::new(config)?))
    }

    #[must_use]
    pub fn from_rest(rest: RestClient) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { rest, events }
    }

    /// Shared data client acting as the signed-in user.
    #[must_use]
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    fn emit(&self, event: AuthEvent) {
        tracing::debug!(?event, "auth event");
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(event);
    }

    async fn resolve_email(&self, identifier: &Identifier) -> Result<String, BackendError> {
        let column = match identifier {
            Identifier::Email(email) => return Ok(email.clone()),
            Identifier::Phone(_) => "phone",
            Identifier::Username(_) => "username",
        };
        let query = Query::new()
            .select("email")
            .eq(column, identifier.as_str())
            .limit(1);
        let rows: Vec<EmailRow> = self.rest.select(PROFILES_TABLE, &query).await?;
        rows.into_iter()
            .find_map(|r| r.email)
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| BackendError::InvalidCredentials(INVALID_CREDENTIALS_MESSAGE.to_owned()))
    }

    /// `None` when the access token is refused.
    async fn fetch_user(&self) -> Result<Option<AuthUser>, BackendError> {
        let req = self
            .rest
            .authorize(self.rest.http().get(self.rest.auth_url("user")));
        let (status, body) = send(req).await?;
        if matches!(status, 401 | 403) {
            return Ok(None);
        }
        Ok(Some(parse_json(&check_status((status, body))?)?))
    }

    /// Exchange the refresh token for a new session. Called by
    /// [`AuthBackend::current_identity`] when the access token has expired.
    ///
    /// A rejected refresh clears the session and reports it as expired.
    ///
    /// # Errors
    ///
    /// [`BackendError::NotAuthenticated`] when there is no refresh token or
    /// the service rejects it; transport failures otherwise.
    pub async fn refresh_session(&self) -> Result<(), BackendError> {
        let refresh_token = self.rest.refresh_token().ok_or(BackendError::NotAuthenticated)?;
        let req = self
            .rest
            .authorize(self.rest.http().post(self.rest.auth_url("token?grant_type=refresh_token")))
            .json(&json!({ "refresh_token": refresh_token }));
        let (status, body) = send(req).await?;
        if matches!(status, 400 | 401 | 403) {
            self.rest.set_tokens(None);
            self.emit(AuthEvent::SessionExpired);
            return Err(BackendError::NotAuthenticated);
        }
        let token: TokenResponse = parse_json(&check_status((status, body))?)?;
        self.rest.set_tokens(Some(token.tokens()));
        self.emit(AuthEvent::TokenRefreshed);
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuthBackend for SupabaseBackend {
    async fn sign_in(&self, identifier: &Identifier, password: &str) -> Result<(), BackendError> {
        let email = self.resolve_email(identifier).await?;
        let req = self
            .rest
            .authorize(self.rest.http().post(self.rest.auth_url("token?grant_type=password")))
            .json(&json!({ "email": email, "password": password }));
        let body = map_sign_in_status(send(req).await?)?;
        let token: TokenResponse = parse_json(&body)?;
        self.rest.set_tokens(Some(token.tokens()));
        self.emit(AuthEvent::SignedIn);
        Ok(())
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), BackendError> {
        let req = self
            .rest
            .authorize(self.rest.http().post(self.rest.auth_url("signup")))
            .json(&sign_up_body(request));
        let body = check_status(send(req).await?)?;
        let outcome = parse_sign_up_response(&body)?;

        let user_id = match &outcome {
            SignUpOutcome::Session(token) => {
                self.rest.set_tokens(Some(token.tokens()));
                token
                    .user
                    .as_ref()
                    .map(|u| u.id.clone())
                    .ok_or_else(|| BackendError::Parse("sign-up session without user".into()))?
            }
            SignUpOutcome::ConfirmationRequired(user) => {
                tracing::info!(user_id = %user.id, "account created; email confirmation pending");
                user.id.clone()
            }
        };

        let _: Vec<serde_json::Value> = self
            .rest
            .insert(PROFILES_TABLE, &profile_row(&user_id, request))
            .await?;

        if matches!(outcome, SignUpOutcome::Session(_)) {
            self.emit(AuthEvent::SignedIn);
        }
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let result = if self.rest.has_session() {
            let req = self
                .rest
                .authorize(self.rest.http().post(self.rest.auth_url("logout")));
            match send(req).await {
                // An already-revoked token still means "signed out".
                Ok((401 | 403, _)) => Ok(()),
                Ok(resp) => check_status(resp).map(|_| ()),
                Err(e) => Err(e),
            }
        } else {
            Ok(())
        };
        self.rest.set_tokens(None);
        self.emit(AuthEvent::SignedOut);
        result
    }

    async fn current_identity(&self) -> Result<Option<Identity>, BackendError> {
        if !self.rest.has_session() {
            return Ok(None);
        }
        let mut user = self.fetch_user().await?;
        if user.is_none() && self.rest.refresh_token().is_some() {
            match self.refresh_session().await {
                Ok(()) => user = self.fetch_user().await?,
                // Already cleared and announced.
                Err(BackendError::NotAuthenticated) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
        let Some(user) = user else {
            self.rest.set_tokens(None);
            self.emit(AuthEvent::SessionExpired);
            return Ok(None);
        };

        let query = Query::new().select("*").eq("id", &user.id).limit(1);
        let profiles: Vec<Profile> = self.rest.select(PROFILES_TABLE, &query).await?;

        Ok(Some(Identity { id: user.id, email: user.email, profile: profiles.into_iter().next() }))
    }

    async fn update_profile(&self, user_id: &str, patch: &ProfilePatch) -> Result<(), BackendError> {
        if patch.is_empty() {
            return Ok(());
        }
        self.rest
            .update(PROFILES_TABLE, &Query::new().eq("id", user_id), patch)
            .await
    }

    fn auth_events(&self) -> Subscription<AuthEvent> {
        Subscription::from_broadcast(self.events.subscribe())
    }
}

// =============================================================================
// PURE HELPERS
// =============================================================================

/// Password-grant responses: any client error is a credential failure.
fn map_sign_in_status((status, body): (u16, String)) -> Result<String, BackendError> {
    match status {
        200..=299 => Ok(body),
        400 | 401 | 403 | 422 => Err(BackendError::InvalidCredentials(
            rest::error_message(&body).unwrap_or_else(|| INVALID_CREDENTIALS_MESSAGE.to_owned()),
        )),
        _ => check_status((status, body)),
    }
}

fn sign_up_body(request: &SignUpRequest) -> serde_json::Value {
    json!({
        "email": request.email,
        "password": request.password,
        "phone": request.phone,
        "data": {
            "username": request.username,
            "full_name": request.full_name,
            "user_type": request.user_type,
        },
    })
}

fn parse_sign_up_response(body: &str) -> Result<SignUpOutcome, BackendError> {
    let value: serde_json::Value = parse_json(body)?;
    if value.get("access_token").is_some() {
        return Ok(SignUpOutcome::Session(
            serde_json::from_value(value).map_err(|e| BackendError::Parse(e.to_string()))?,
        ));
    }
    let user = value.get("user").cloned().unwrap_or(value);
    Ok(SignUpOutcome::ConfirmationRequired(
        serde_json::from_value(user).map_err(|e| BackendError::Parse(e.to_string()))?,
    ))
}

/// Profile row inserted after account creation. Payment always starts
/// pending; a supplier's reference is stored as typed for manual review.
fn profile_row(user_id: &str, request: &SignUpRequest) -> serde_json::Value {
    let payment_reference = request
        .payment_reference
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    json!({
        "id": user_id,
        "email": request.email,
        "username": request.username,
        "full_name": request.full_name,
        "phone": request.phone,
        "user_type": request.user_type,
        "country": request.country,
        "city": request.city,
        "address": request.address,
        "payment_status": PaymentStatus::Pending,
        "payment_reference": payment_reference,
        "is_verified": false,
    })
}

#[cfg(test)]
#[path = "supabase_test.rs"]
mod tests;
