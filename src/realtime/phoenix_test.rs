use super::*;

// =============================================================================
// socket_url / topic_for
// =============================================================================

#[test]
fn socket_url_https_becomes_wss() {
    assert_eq!(
        socket_url("https://abc.supabase.co/", "anon"),
        "wss://abc.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
    );
}

#[test]
fn socket_url_http_becomes_ws() {
    assert_eq!(
        socket_url("http://localhost:54321", "k"),
        "ws://localhost:54321/realtime/v1/websocket?apikey=k&vsn=1.0.0"
    );
}

#[test]
fn topic_includes_filter() {
    assert_eq!(topic_for("messages", None), "realtime:public:messages");
    assert_eq!(
        topic_for("messages", Some("conversation_id=eq.c1")),
        "realtime:public:messages:conversation_id=eq.c1"
    );
}

// =============================================================================
// outbound messages
// =============================================================================

#[test]
fn join_message_shape() {
    let msg = join_message("realtime:public:messages", "messages", Some("conversation_id=eq.c1"), Some("jwt"));
    assert_eq!(msg["event"], "phx_join");
    assert_eq!(msg["ref"], "1");
    let change = &msg["payload"]["config"]["postgres_changes"][0];
    assert_eq!(change["event"], "INSERT");
    assert_eq!(change["table"], "messages");
    assert_eq!(change["filter"], "conversation_id=eq.c1");
    assert_eq!(msg["payload"]["access_token"], "jwt");
}

#[test]
fn join_message_without_filter_or_token() {
    let msg = join_message("realtime:public:products", "products", None, None);
    let change = &msg["payload"]["config"]["postgres_changes"][0];
    assert!(change.get("filter").is_none());
    assert!(msg["payload"].get("access_token").is_none());
}

#[test]
fn heartbeat_targets_phoenix_topic() {
    let msg = heartbeat_message("7");
    assert_eq!(msg["topic"], "phoenix");
    assert_eq!(msg["event"], "heartbeat");
    assert_eq!(msg["ref"], "7");
}

#[test]
fn leave_targets_joined_channel() {
    let msg = leave_message("realtime:public:messages", "9");
    assert_eq!(msg["topic"], "realtime:public:messages");
    assert_eq!(msg["event"], "phx_leave");
    assert_eq!(msg["ref"], "9");
    assert_eq!(msg["join_ref"], JOIN_REF);
}

// =============================================================================
// parse_inbound
// =============================================================================

#[test]
fn parse_insert_record() {
    let text = json!({
        "event": "postgres_changes",
        "topic": "realtime:public:messages",
        "ref": null,
        "payload": {
            "data": {
                "type": "INSERT",
                "table": "messages",
                "record": { "id": "m1", "content": "Bonjour" }
            },
            "ids": [1]
        }
    })
    .to_string();
    let inbound = parse_inbound(&text).unwrap();
    assert_eq!(inbound, Inbound::Insert(json!({ "id": "m1", "content": "Bonjour" })));
}

#[test]
fn parse_update_is_ignored() {
    let text = json!({
        "event": "postgres_changes",
        "payload": { "data": { "type": "UPDATE", "record": { "id": "m1" } } }
    })
    .to_string();
    assert_eq!(parse_inbound(&text).unwrap(), Inbound::Ignored);
}

#[test]
fn parse_join_reply_ok() {
    let text = json!({ "event": "phx_reply", "ref": "1", "payload": { "status": "ok", "response": {} } }).to_string();
    assert_eq!(parse_inbound(&text).unwrap(), Inbound::JoinReply { ok: true, reason: None });
}

#[test]
fn parse_join_reply_error_carries_reason() {
    let text = json!({
        "event": "phx_reply",
        "ref": "1",
        "payload": { "status": "error", "response": { "reason": "unauthorized" } }
    })
    .to_string();
    assert_eq!(
        parse_inbound(&text).unwrap(),
        Inbound::JoinReply { ok: false, reason: Some("unauthorized".into()) }
    );
}

#[test]
fn parse_heartbeat_reply_is_ignored() {
    let text = json!({ "event": "phx_reply", "ref": "5", "payload": { "status": "ok" } }).to_string();
    assert_eq!(parse_inbound(&text).unwrap(), Inbound::Ignored);
}

#[test]
fn parse_close_and_error() {
    assert_eq!(parse_inbound(r#"{"event":"phx_close","payload":{}}"#).unwrap(), Inbound::Closed);
    assert_eq!(
        parse_inbound(r#"{"event":"phx_error","payload":{"reason":"boom"}}"#).unwrap(),
        Inbound::ChannelError("boom".into())
    );
}

#[test]
fn parse_rejects_non_json_and_missing_event() {
    assert!(matches!(parse_inbound("nope"), Err(BackendError::Parse(_))));
    assert!(matches!(parse_inbound(r#"{"payload":{}}"#), Err(BackendError::Parse(_))));
}
