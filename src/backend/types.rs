//! Backend types: identity model, auth requests, events and errors.
//!
//! These mirror the rows and payloads of the hosted auth/data service. The
//! client never edits an [`Identity`] in place; it always re-fetches one.

use serde::{Deserialize, Serialize};

/// Generic failure shown when the service error is not meant for end users.
pub const GENERIC_FAILURE_MESSAGE: &str = "Erreur de connexion";

/// Shown when a phone/username/email does not resolve to an account.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Identifiants invalides";

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by backend operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The service refused the credentials. Message is shown verbatim.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The service rejected the request (duplicate account, bad field...).
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The request never produced a response (DNS, TLS, timeout, socket).
    #[error("network error: {0}")]
    Network(String),

    /// The service returned an unexpected non-success status.
    #[error("service error: status {status}")]
    Service { status: u16, body: String },

    /// A response body could not be decoded.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The operation needs a signed-in identity.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Configuration is missing or malformed.
    #[error("config error: {0}")]
    Config(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl BackendError {
    /// Message suitable for a form error line.
    ///
    /// Credential and rejection messages come from the service and are
    /// surfaced as-is; everything else collapses to a generic failure.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::InvalidCredentials(msg) | Self::Rejected(msg) if !msg.trim().is_empty() => msg.clone(),
            Self::InvalidCredentials(_) => INVALID_CREDENTIALS_MESSAGE.to_owned(),
            _ => GENERIC_FAILURE_MESSAGE.to_owned(),
        }
    }

    /// `true` for failures caused by transport or service availability.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Service { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Account kind chosen at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    Simple,
    Supplier,
}

impl UserType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Supplier => "supplier",
        }
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "supplier" => Ok(Self::Supplier),
            other => Err(format!("unknown user type: {other}")),
        }
    }
}

/// Supplier fee verification state. Flipped to `paid` outside this client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Rejected,
    #[serde(other)]
    Unknown,
}

/// Profile row joined to the auth record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// The authenticated user: auth record plus its profile row, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub profile: Option<Profile>,
}

impl Identity {
    #[must_use]
    pub fn user_type(&self) -> UserType {
        self.profile.as_ref().map_or(UserType::Simple, |p| p.user_type)
    }

    #[must_use]
    pub fn is_supplier(&self) -> bool {
        self.user_type() == UserType::Supplier
    }

    #[must_use]
    pub fn payment_status(&self) -> PaymentStatus {
        self.profile.as_ref().map_or(PaymentStatus::Pending, |p| p.payment_status)
    }

    /// Supplier-only features unlock once the registration fee is confirmed.
    #[must_use]
    pub fn supplier_features_enabled(&self) -> bool {
        self.is_supplier() && self.payment_status() == PaymentStatus::Paid
    }

    /// Best display name: full name, then username, then email, then id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let profile = self.profile.as_ref();
        profile
            .and_then(|p| p.full_name.as_deref())
            .or_else(|| profile.and_then(|p| p.username.as_deref()))
            .or(self.email.as_deref())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.id)
    }

    /// Profile fields a registration must have filled in.
    #[must_use]
    pub fn missing_profile_fields(&self) -> Vec<&'static str> {
        let Some(p) = self.profile.as_ref() else {
            return vec!["profile"];
        };
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        let mut missing = Vec::new();
        for (name, value) in [
            ("full_name", &p.full_name),
            ("phone", &p.phone),
            ("country", &p.country),
            ("city", &p.city),
            ("address", &p.address),
        ] {
            if blank(value) {
                missing.push(name);
            }
        }
        missing
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// A sign-in identifier, classified from free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Email(String),
    Phone(String),
    Username(String),
}

impl Identifier {
    /// Classify raw input: `@` means email, digits with `+ - ( )` and spaces
    /// mean phone, anything else is a username. Blank input yields `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.contains('@') {
            return Some(Self::Email(trimmed.to_ascii_lowercase()));
        }
        if looks_like_phone(trimmed) {
            return Some(Self::Phone(trimmed.to_owned()));
        }
        Some(Self::Username(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(v) | Self::Phone(v) | Self::Username(v) => v,
        }
    }

    /// Form label for the identifier kind.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Email(_) => "Email",
            Self::Phone(_) => "Téléphone",
            Self::Username(_) => "Nom d'utilisateur",
        }
    }
}

fn looks_like_phone(s: &str) -> bool {
    let body = s.strip_prefix('+').unwrap_or(s);
    !body.is_empty()
        && body.chars().any(|c| c.is_ascii_digit())
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '(' | ')'))
}

/// Account creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub phone: String,
    pub username: String,
    pub full_name: String,
    pub user_type: UserType,
    pub country: String,
    pub city: String,
    pub address: String,
    /// Out-of-band payment reference typed by a supplier; never verified here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfilePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the set fields onto `profile`. Used by the in-process backend.
    pub fn apply_to(&self, profile: &mut Profile) {
        let set = |dst: &mut Option<String>, src: &Option<String>| {
            if let Some(v) = src {
                *dst = Some(v.trim().to_owned());
            }
        };
        set(&mut profile.full_name, &self.full_name);
        set(&mut profile.username, &self.username);
        set(&mut profile.phone, &self.phone);
        set(&mut profile.address, &self.address);
        set(&mut profile.city, &self.city);
        set(&mut profile.country, &self.country);
        set(&mut profile.bio, &self.bio);
        set(&mut profile.avatar_url, &self.avatar_url);
    }
}

// =============================================================================
// AUTH EVENTS
// =============================================================================

/// Session transitions reported by the auth service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    /// The session was revoked or expired without a local sign-out.
    SessionExpired,
}

impl AuthEvent {
    /// `true` when the event means no session remains.
    #[must_use]
    pub fn ends_session(self) -> bool {
        matches!(self, Self::SignedOut | Self::SessionExpired)
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
