use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A message held in the rolling per-channel buffer. Owned by its channel's
/// buffer until it ages out of the context window.
#[derive(Debug, Clone)]
pub struct BufferedMessage {
    pub id: String,
    pub author: String,
    pub user_id: String,
    pub content: String,
    pub channel_id: String,
    pub guild_id: String,
    pub timestamp: DateTime<Utc>,
    pub checked: bool,
}

impl BufferedMessage {
    pub fn to_new_message(&self) -> NewMessage {
        NewMessage {
            id: self.id.clone(),
            author: self.author.clone(),
            user_id: self.user_id.clone(),
            content: self.content.clone(),
            channel_id: self.channel_id.clone(),
            timestamp: iso8601(&self.timestamp),
        }
    }

    pub fn to_context_message(&self) -> ContextMessage {
        ContextMessage {
            author: self.author.clone(),
            content: self.content.clone(),
            timestamp: iso8601(&self.timestamp),
        }
    }
}

fn iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A message the moderation service has not evaluated yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub id: String,
    pub author: String,
    pub user_id: String,
    pub content: String,
    pub channel_id: String,
    pub timestamp: String,
}

/// Read-only background for the batch; deliberately carries no identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMessage {
    pub author: String,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub guild_id: String,
    pub new_messages: Vec<NewMessage>,
    pub context_messages: Vec<ContextMessage>,
}

#[derive(Debug, Deserialize)]
pub struct BatchResponse {
    pub checked: u64,
    pub violations: u64,
}
