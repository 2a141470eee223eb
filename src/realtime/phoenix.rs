//! Realtime websocket client (Phoenix channel protocol).
//!
//! One socket per subscription: connect, join a `postgres_changes` channel
//! for row inserts on one table, then pump records into a
//! [`Subscription`] while sending heartbeats. Closing the subscription
//! sends `phx_leave` and a websocket close frame before the task exits.
//! Message building and parsing are pure functions so they can be tested
//! without a socket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::Subscription;
use crate::backend::BackendError;
use crate::backend::rest::RestClient;
use crate::config::BackendConfig;

const PROTOCOL_VERSION: &str = "1.0.0";
const JOIN_TIMEOUT_SECS: u64 = 10;
const LEAVE_TIMEOUT_SECS: u64 = 2;
const JOIN_REF: &str = "1";

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone)]
pub struct RealtimeClient {
    socket_url: String,
    heartbeat: Duration,
    rest: RestClient,
}

impl RealtimeClient {
    #[must_use]
    pub fn new(config: &BackendConfig, rest: RestClient) -> Self {
        Self {
            socket_url: socket_url(&config.url, &config.anon_key),
            heartbeat: Duration::from_secs(config.realtime_heartbeat_secs),
            rest,
        }
    }

    /// Subscribe to inserts on `table`, optionally narrowed by a PostgREST
    /// style `filter` (e.g. `conversation_id=eq.<id>`). Resolves once the
    /// channel join is acknowledged.
    ///
    /// # Errors
    ///
    /// [`BackendError::Network`] when the socket cannot be opened or closes
    /// before the join reply, [`BackendError::Rejected`] when the service
    /// refuses the join.
    pub async fn subscribe_inserts<T>(&self, table: &str, filter: Option<&str>) -> Result<Subscription<T>, BackendError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let topic = topic_for(table, filter);
        let (ws, _) = connect_async(self.socket_url.as_str())
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let token = self.rest.access_token();
        let join = join_message(&topic, table, filter, token.as_deref());
        sink.send(Message::text(join.to_string()))
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let wait_join = async {
            while let Some(msg) = stream.next().await {
                let msg = msg.map_err(|e| BackendError::Network(e.to_string()))?;
                let Message::Text(text) = msg else { continue };
                match parse_inbound(text.as_str())? {
                    Inbound::JoinReply { ok: true, .. } => return Ok(()),
                    Inbound::JoinReply { ok: false, reason } => {
                        return Err(BackendError::Rejected(reason.unwrap_or_else(|| "join refused".into())));
                    }
                    Inbound::ChannelError(reason) => return Err(BackendError::Rejected(reason)),
                    _ => {}
                }
            }
            Err(BackendError::Network("socket closed before join reply".into()))
        };
        tokio::time::timeout(Duration::from_secs(JOIN_TIMEOUT_SECS), wait_join)
            .await
            .map_err(|_| BackendError::Network("timed out joining realtime channel".into()))??;

        tracing::debug!(%topic, "realtime channel joined");

        let (tx, sub) = Subscription::channel();
        let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel::<()>();
        let heartbeat = self.heartbeat;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(heartbeat);
            ticker.tick().await;
            let mut next_ref: u64 = 2;
            // Set when the socket is still usable on exit.
            let mut leave = false;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        leave = true;
                        break;
                    }
                    _ = ticker.tick() => {
                        let beat = heartbeat_message(&next_ref.to_string());
                        next_ref += 1;
                        if sink.send(Message::text(beat.to_string())).await.is_err() {
                            break;
                        }
                    }
                    msg = stream.next() => {
                        let text = match msg {
                            Some(Ok(Message::Text(text))) => text,
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                tracing::warn!(error = %e, %topic, "realtime socket error");
                                break;
                            }
                        };
                        match parse_inbound(text.as_str()) {
                            Ok(Inbound::Insert(record)) => match serde_json::from_value::<T>(record) {
                                Ok(item) => {
                                    if tx.send(item).await.is_err() {
                                        leave = true;
                                        break;
                                    }
                                }
                                Err(e) => tracing::warn!(error = %e, %topic, "dropping undecodable realtime record"),
                            },
                            Ok(Inbound::ChannelError(reason)) => {
                                tracing::warn!(%reason, %topic, "realtime channel error");
                                break;
                            }
                            Ok(Inbound::Closed) => break,
                            Ok(_) => {}
                            Err(e) => tracing::debug!(error = %e, "ignoring unparseable realtime message"),
                        }
                    }
                }
            }
            if leave {
                let goodbye = async {
                    let msg = leave_message(&topic, &next_ref.to_string());
                    sink.send(Message::text(msg.to_string())).await?;
                    sink.close().await
                };
                match tokio::time::timeout(Duration::from_secs(LEAVE_TIMEOUT_SECS), goodbye).await {
                    Ok(Ok(())) => tracing::debug!(%topic, "realtime channel left"),
                    Ok(Err(e)) => tracing::debug!(error = %e, %topic, "realtime leave failed"),
                    Err(_) => tracing::debug!(%topic, "realtime leave timed out"),
                }
            }
            tracing::debug!(%topic, "realtime subscription ended");
        });

        Ok(sub.with_task(task).with_stop(stop_tx))
    }
}

// =============================================================================
// WIRE MESSAGES
// =============================================================================

/// Derive the websocket endpoint from the project's http(s) base URL.
#[must_use]
pub fn socket_url(base_url: &str, api_key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_owned()
    };
    format!("{ws_base}/realtime/v1/websocket?apikey={api_key}&vsn={PROTOCOL_VERSION}")
}

#[must_use]
pub fn topic_for(table: &str, filter: Option<&str>) -> String {
    match filter {
        Some(f) => format!("realtime:public:{table}:{f}"),
        None => format!("realtime:public:{table}"),
    }
}

#[must_use]
pub fn join_message(topic: &str, table: &str, filter: Option<&str>, access_token: Option<&str>) -> Value {
    let mut change = json!({ "event": "INSERT", "schema": "public", "table": table });
    if let Some(f) = filter {
        change["filter"] = json!(f);
    }
    let mut payload = json!({
        "config": {
            "broadcast": { "ack": false, "self": false },
            "presence": { "key": "" },
            "postgres_changes": [change],
        }
    });
    if let Some(token) = access_token {
        payload["access_token"] = json!(token);
    }
    json!({ "topic": topic, "event": "phx_join", "payload": payload, "ref": JOIN_REF, "join_ref": JOIN_REF })
}

#[must_use]
pub fn heartbeat_message(msg_ref: &str) -> Value {
    json!({ "topic": "phoenix", "event": "heartbeat", "payload": {}, "ref": msg_ref })
}

#[must_use]
pub fn leave_message(topic: &str, msg_ref: &str) -> Value {
    json!({ "topic": topic, "event": "phx_leave", "payload": {}, "ref": msg_ref, "join_ref": JOIN_REF })
}

/// Inbound messages the client reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A row inserted into the subscribed table.
    Insert(Value),
    /// Reply to our channel join.
    JoinReply { ok: bool, reason: Option<String> },
    ChannelError(String),
    Closed,
    /// Heartbeat replies, presence, system notices.
    Ignored,
}

/// Classify one inbound text frame.
///
/// # Errors
///
/// [`BackendError::Parse`] when the frame is not a JSON object with an
/// `event` field.
pub fn parse_inbound(text: &str) -> Result<Inbound, BackendError> {
    let value: Value = serde_json::from_str(text).map_err(|e| BackendError::Parse(e.to_string()))?;
    let event = value
        .get("event")
        .and_then(Value::as_str)
        .ok_or_else(|| BackendError::Parse("realtime message without event".into()))?;
    let payload = value.get("payload").cloned().unwrap_or(Value::Null);

    let inbound = match event {
        "postgres_changes" => {
            let data = payload.get("data");
            let is_insert = data
                .and_then(|d| d.get("type"))
                .and_then(Value::as_str)
                .is_some_and(|t| t.eq_ignore_ascii_case("insert"));
            match data.and_then(|d| d.get("record")) {
                Some(record) if is_insert => Inbound::Insert(record.clone()),
                _ => Inbound::Ignored,
            }
        }
        "phx_reply" if value.get("ref").and_then(Value::as_str) == Some(JOIN_REF) => {
            let ok = payload.get("status").and_then(Value::as_str) == Some("ok");
            let reason = payload
                .get("response")
                .and_then(|r| r.get("reason"))
                .and_then(Value::as_str)
                .map(str::to_owned);
            Inbound::JoinReply { ok, reason }
        }
        "phx_error" => Inbound::ChannelError(
            payload
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("channel error")
                .to_owned(),
        ),
        "phx_close" => Inbound::Closed,
        _ => Inbound::Ignored,
    };
    Ok(inbound)
}

#[cfg(test)]
#[path = "phoenix_test.rs"]
mod tests;
