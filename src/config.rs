//! Backend configuration parsed from environment variables.

use crate::backend::BackendError;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REALTIME_HEARTBEAT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Project base URL, without trailing slash (e.g. `https://abc.supabase.co`).
    pub url: String,
    /// Public anon key sent as `apikey` on every request.
    pub anon_key: String,
    pub timeouts: HttpTimeouts,
    pub realtime_heartbeat_secs: u64,
}

impl BackendConfig {
    /// Build typed backend config from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `TRADHUB_REQUEST_TIMEOUT_SECS`: default 30
    /// - `TRADHUB_CONNECT_TIMEOUT_SECS`: default 10
    /// - `TRADHUB_REALTIME_HEARTBEAT_SECS`: default 30
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Config`] when a required variable is missing
    /// or the URL is not http(s).
    pub fn from_env() -> Result<Self, BackendError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BackendConfig::from_env`] but reads through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`BackendConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BackendError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("SUPABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| BackendError::Config("SUPABASE_URL not set".into()))?;
        let url = url.trim().trim_end_matches('/').to_string();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(BackendError::Config(format!("SUPABASE_URL must be http(s): {url}")));
        }

        let anon_key = lookup("SUPABASE_ANON_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| BackendError::Config("SUPABASE_ANON_KEY not set".into()))?;

        let timeouts = HttpTimeouts {
            request_secs: parse_u64(&lookup, "TRADHUB_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(&lookup, "TRADHUB_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let realtime_heartbeat_secs =
            parse_u64(&lookup, "TRADHUB_REALTIME_HEARTBEAT_SECS", DEFAULT_REALTIME_HEARTBEAT_SECS).max(1);

        Ok(Self { url, anon_key: anon_key.trim().to_string(), timeouts, realtime_heartbeat_secs })
    }
}

fn parse_u64<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
