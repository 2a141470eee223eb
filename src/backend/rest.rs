//! Authenticated JSON requests against the hosted auth and data APIs.
//!
//! `RestClient` is cheap to clone; clones share the session tokens, so the
//! auth backend, catalog, chat and realtime clients all act as the same user.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::query::Query;
use super::types::BackendError;
use crate::config::BackendConfig;

/// Tokens issued by the auth service for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    tokens: Arc<RwLock<Option<SessionTokens>>>,
}

impl RestClient {
    /// # Errors
    ///
    /// Returns [`BackendError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| BackendError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.url.clone(), api_key: config.anon_key.clone(), tokens: Arc::default() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.read_tokens().map(|t| t.access_token)
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.read_tokens().and_then(|t| t.refresh_token)
    }

    #[must_use]
    pub fn has_session(&self) -> bool {
        self.read_tokens().is_some()
    }

    pub(crate) fn set_tokens(&self, tokens: Option<SessionTokens>) {
        match self.tokens.write() {
            Ok(mut guard) => *guard = tokens,
            Err(poisoned) => *poisoned.into_inner() = tokens,
        }
    }

    fn read_tokens(&self) -> Option<SessionTokens> {
        match self.tokens.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    #[must_use]
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Attach `apikey` and a bearer: the session token when signed in,
    /// otherwise the anon key.
    pub(crate) fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self.access_token().unwrap_or_else(|| self.api_key.clone());
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }

    /// `GET /rest/v1/{table}` with the query's filters.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures as [`BackendError`].
    pub async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Vec<T>, BackendError> {
        tracing::debug!(table, "rest select");
        let req = self
            .authorize(self.http.get(self.table_url(table)))
            .query(&query.to_pairs());
        let body = check_status(send(req).await?)?;
        parse_json(&body)
    }

    /// `POST /rest/v1/{table}` returning the inserted rows.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures as [`BackendError`].
    pub async fn insert<B, T>(&self, table: &str, row: &B) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(table, "rest insert");
        let req = self
            .authorize(self.http.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(row);
        let body = check_status(send(req).await?)?;
        parse_json(&body)
    }

    /// `PATCH /rest/v1/{table}` on the rows matched by `query`.
    ///
    /// # Errors
    ///
    /// Transport and status failures as [`BackendError`].
    pub async fn update<B>(&self, table: &str, query: &Query, patch: &B) -> Result<(), BackendError>
    where
        B: Serialize + ?Sized,
    {
        tracing::debug!(table, "rest update");
        let req = self
            .authorize(self.http.patch(self.table_url(table)))
            .query(&query.to_pairs())
            .header("Prefer", "return=minimal")
            .json(patch);
        check_status(send(req).await?)?;
        Ok(())
    }

    /// `DELETE /rest/v1/{table}` on the rows matched by `query`.
    ///
    /// # Errors
    ///
    /// Transport and status failures as [`BackendError`].
    pub async fn delete(&self, table: &str, query: &Query) -> Result<(), BackendError> {
        tracing::debug!(table, "rest delete");
        let req = self
            .authorize(self.http.delete(self.table_url(table)))
            .query(&query.to_pairs());
        check_status(send(req).await?)?;
        Ok(())
    }
}

// =============================================================================
// RESPONSE HANDLING
// =============================================================================

/// Send a request and read status plus body text.
pub(crate) async fn send(req: reqwest::RequestBuilder) -> Result<(u16, String), BackendError> {
    let resp = req.send().await.map_err(|e| BackendError::Network(e.to_string()))?;
    let status = resp.status().as_u16();
    let body = resp.text().await.map_err(|e| BackendError::Network(e.to_string()))?;
    Ok((status, body))
}

/// Map a data-API response to its body or an error.
pub(crate) fn check_status((status, body): (u16, String)) -> Result<String, BackendError> {
    match status {
        200..=299 => Ok(body),
        400 | 409 | 422 => match error_message(&body) {
            Some(msg) => Err(BackendError::Rejected(msg)),
            None => Err(BackendError::Service { status, body }),
        },
        _ => Err(BackendError::Service { status, body }),
    }
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))
}

/// Human message from an auth or data error body.
///
/// The auth API uses `msg` or `error_description`, the data API `message`;
/// older endpoints only send `error`.
#[must_use]
pub fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "rest_test.rs"]
mod tests;
