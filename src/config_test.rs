use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn from_lookup_applies_defaults() {
    let cfg = BackendConfig::from_lookup(lookup_from(&[
        ("SUPABASE_URL", "https://abc.supabase.co"),
        ("SUPABASE_ANON_KEY", "anon"),
    ]))
    .unwrap();

    assert_eq!(cfg.url, "https://abc.supabase.co");
    assert_eq!(cfg.anon_key, "anon");
    assert_eq!(cfg.timeouts, HttpTimeouts::default());
    assert_eq!(cfg.realtime_heartbeat_secs, DEFAULT_REALTIME_HEARTBEAT_SECS);
}

#[test]
fn from_lookup_parses_overrides_and_trims_url() {
    let cfg = BackendConfig::from_lookup(lookup_from(&[
        ("SUPABASE_URL", " https://abc.supabase.co/ "),
        ("SUPABASE_ANON_KEY", "anon"),
        ("TRADHUB_REQUEST_TIMEOUT_SECS", "42"),
        ("TRADHUB_CONNECT_TIMEOUT_SECS", "7"),
        ("TRADHUB_REALTIME_HEARTBEAT_SECS", "15"),
    ]))
    .unwrap();

    assert_eq!(cfg.url, "https://abc.supabase.co");
    assert_eq!(cfg.timeouts, HttpTimeouts { request_secs: 42, connect_secs: 7 });
    assert_eq!(cfg.realtime_heartbeat_secs, 15);
}

#[test]
fn from_lookup_invalid_numbers_fall_back() {
    let cfg = BackendConfig::from_lookup(lookup_from(&[
        ("SUPABASE_URL", "http://localhost:54321"),
        ("SUPABASE_ANON_KEY", "anon"),
        ("TRADHUB_REQUEST_TIMEOUT_SECS", "soon"),
        ("TRADHUB_REALTIME_HEARTBEAT_SECS", "0"),
    ]))
    .unwrap();

    assert_eq!(cfg.timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    assert_eq!(cfg.realtime_heartbeat_secs, 1);
}

#[test]
fn from_lookup_missing_url_errors() {
    let err = BackendConfig::from_lookup(lookup_from(&[("SUPABASE_ANON_KEY", "anon")])).unwrap_err();
    assert!(err.to_string().contains("SUPABASE_URL"));
}

#[test]
fn from_lookup_blank_key_errors() {
    let err = BackendConfig::from_lookup(lookup_from(&[
        ("SUPABASE_URL", "https://abc.supabase.co"),
        ("SUPABASE_ANON_KEY", "   "),
    ]))
    .unwrap_err();
    assert!(matches!(err, BackendError::Config(_)));
}

#[test]
fn from_lookup_rejects_non_http_url() {
    let err = BackendConfig::from_lookup(lookup_from(&[
        ("SUPABASE_URL", "ftp://abc"),
        ("SUPABASE_ANON_KEY", "anon"),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("http(s)"));
}
