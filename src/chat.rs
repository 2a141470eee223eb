//! Buyer/supplier conversations.
//!
//! History and sends go through the data API; live messages arrive through
//! a realtime insert subscription on `messages`, narrowed to one
//! conversation.

use serde::{Deserialize, Serialize};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, Weekday};

use crate::backend::BackendError;
use crate::backend::query::Query;
use crate::backend::rest::RestClient;
use crate::realtime::Subscription;
use crate::realtime::phoenix::RealtimeClient;

pub const EMPTY_MESSAGE: &str = "Le message est vide";

const CONVERSATION_COLUMNS: &str = "*,
    participant1:participant1_id(id, full_name, avatar_url),
    participant2:participant2_id(id, full_name, avatar_url),
    product:product_id(id, title, images)";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A conversation row. Embedded participants and product are absent on a
/// row that was just created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant1_id: String,
    pub participant2_id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub participant1: Option<Participant>,
    #[serde(default)]
    pub participant2: Option<Participant>,
    #[serde(default)]
    pub product: Option<ProductRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ChatMessage {
    #[must_use]
    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender_id == user_id
    }
}

#[derive(Clone)]
pub struct ChatService {
    rest: RestClient,
    realtime: RealtimeClient,
}

impl ChatService {
    #[must_use]
    pub fn new(rest: RestClient, realtime: RealtimeClient) -> Self {
        Self { rest, realtime }
    }

    /// Conversations `user_id` takes part in, most recent activity first.
    ///
    /// # Errors
    ///
    /// Any data-API failure.
    pub async fn conversations(&self, user_id: &str) -> Result<Vec<Conversation>, BackendError> {
        self.rest
            .select("conversations", &conversations_query(user_id))
            .await
    }

    /// Messages of one conversation, oldest first.
    ///
    /// # Errors
    ///
    /// Any data-API failure.
    pub async fn messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, BackendError> {
        let query = Query::new()
            .select("*")
            .eq("conversation_id", conversation_id)
            .order("created_at", true);
        self.rest.select("messages", &query).await
    }

    /// Post a message and bump the conversation's last-message preview.
    ///
    /// # Errors
    ///
    /// [`BackendError::Rejected`] for blank content; any data-API failure.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<ChatMessage, BackendError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(BackendError::Rejected(EMPTY_MESSAGE.into()));
        }

        let row = json!({ "conversation_id": conversation_id, "sender_id": sender_id, "content": content });
        let message = self
            .rest
            .insert::<_, ChatMessage>("messages", &row)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Parse("insert returned no message".into()))?;

        let sent_at = message.created_at.clone().unwrap_or_else(now_rfc3339);
        let preview = json!({ "last_message": content, "last_message_at": sent_at });
        self.rest
            .update("conversations", &Query::new().eq("id", conversation_id), &preview)
            .await?;
        Ok(message)
    }

    /// Existing conversation between buyer and supplier about `product_id`,
    /// or a new one.
    ///
    /// # Errors
    ///
    /// Any data-API failure.
    pub async fn start_conversation(
        &self,
        buyer_id: &str,
        supplier_id: &str,
        product_id: &str,
    ) -> Result<Conversation, BackendError> {
        let existing: Vec<Conversation> = self
            .rest
            .select("conversations", &existing_conversation_query(buyer_id, supplier_id, product_id))
            .await?;
        if let Some(conversation) = existing.into_iter().next() {
            return Ok(conversation);
        }

        tracing::info!(buyer_id, supplier_id, product_id, "starting conversation");
        let row = json!({
            "participant1_id": buyer_id,
            "participant2_id": supplier_id,
            "product_id": product_id,
        });
        self.rest
            .insert::<_, Conversation>("conversations", &row)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Parse("insert returned no conversation".into()))
    }

    /// Live inserts into one conversation. Dropping the subscription leaves
    /// the channel.
    ///
    /// # Errors
    ///
    /// The realtime join failure.
    pub async fn subscribe_to_messages(&self, conversation_id: &str) -> Result<Subscription<ChatMessage>, BackendError> {
        self.realtime
            .subscribe_inserts("messages", Some(&message_filter(conversation_id)))
            .await
    }
}

#[must_use]
pub fn conversations_query(user_id: &str) -> Query {
    Query::new()
        .select(CONVERSATION_COLUMNS)
        .or(&[format!("participant1_id.eq.{user_id}"), format!("participant2_id.eq.{user_id}")])
        .order("last_message_at", false)
}

fn existing_conversation_query(buyer_id: &str, supplier_id: &str, product_id: &str) -> Query {
    Query::new()
        .select(CONVERSATION_COLUMNS)
        .eq("participant1_id", buyer_id)
        .eq("participant2_id", supplier_id)
        .eq("product_id", product_id)
        .limit(1)
}

#[must_use]
pub fn message_filter(conversation_id: &str) -> String {
    format!("conversation_id=eq.{conversation_id}")
}

/// The participant that is not `user_id`.
#[must_use]
pub fn other_participant<'a>(conversation: &'a Conversation, user_id: &str) -> Option<&'a Participant> {
    if conversation.participant1_id == user_id {
        conversation.participant2.as_ref()
    } else {
        conversation.participant1.as_ref()
    }
}

/// Avatar fallback: first letter of each name part, upper-cased.
#[must_use]
pub fn initials(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Conversation-list timestamp: `HH:MM` within a day, short French weekday
/// within a week, `DD/MM` otherwise. Times are shown in UTC.
#[must_use]
pub fn format_activity_time(timestamp: &str, now: OffsetDateTime) -> Option<String> {
    let at = OffsetDateTime::parse(timestamp, &Rfc3339).ok()?.to_offset(time::UtcOffset::UTC);
    let age = now - at;
    let text = if age.whole_hours() < 24 {
        format!("{:02}:{:02}", at.hour(), at.minute())
    } else if age.whole_days() < 7 {
        weekday_fr(at.weekday()).to_owned()
    } else {
        format!("{:02}/{:02}", at.day(), u8::from(at.month()))
    };
    Some(text)
}

fn weekday_fr(day: Weekday) -> &'static str {
    match day {
        Weekday::Monday => "lun.",
        Weekday::Tuesday => "mar.",
        Weekday::Wednesday => "mer.",
        Weekday::Thursday => "jeu.",
        Weekday::Friday => "ven.",
        Weekday::Saturday => "sam.",
        Weekday::Sunday => "dim.",
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
