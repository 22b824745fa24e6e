//! Chat messages

use super::{MessageId, Paper};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// `user_id` the service uses for assistant turns
pub const ASSISTANT_USER_ID: &str = "system";
/// `user_id` the service uses for paper cards
pub const CARD_USER_ID: &str = "card";
/// `user_id` the service uses for tool output
pub const TOOL_USER_ID: &str = "tool";

/// Who produced a message, as declared by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A project member
    User,
    /// The assistant (history responses call it `ai`)
    #[serde(alias = "ai")]
    Assistant,
}

/// Text payload of a content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextBody {
    /// Plain text or pre-rendered HTML
    Plain(String),
    /// Paper card payload
    Card(Paper),
}

/// Inline image reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    /// `data:` or http URL
    pub url: String,
}

/// Inline file reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    /// Original file name
    pub filename: String,
    /// `data:` URL or link
    pub file_data: String,
}

/// One element of a message's content list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text, HTML or a paper card
    Text {
        /// The payload
        text: TextBody,
    },
    /// Attached image
    ImageUrl {
        /// Image reference
        image_url: ImageRef,
    },
    /// Attached file
    File {
        /// File reference
        file: FileRef,
    },
}

/// Classification of a message's author from its `user_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author<'a> {
    /// Assistant turn
    Assistant,
    /// Paper card pushed by the assistant
    Card,
    /// Tool output
    Tool,
    /// A project member, by user id
    Member(&'a str),
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Server id, absent on some live events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,

    /// Chat the message belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<MessageId>,

    /// Declared role
    pub role: Role,

    /// Author id (`system`, `card`, `tool` or a user id)
    pub user_id: String,

    /// Author display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Content parts; the first is the text
    #[serde(default)]
    pub content: Vec<ContentPart>,

    /// ISO 8601 timestamp as sent by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Raw tool calls recorded with assistant turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<serde_json::Value>,
}

impl Message {
    /// Build a paper-card message from a `new_card` payload
    pub fn card(paper: Paper) -> Self {
        Self {
            id: None,
            chat_id: None,
            role: Role::Assistant,
            user_id: CARD_USER_ID.to_string(),
            username: None,
            content: vec![ContentPart::Text {
                text: TextBody::Card(paper),
            }],
            timestamp: None,
            tool_calls: None,
        }
    }

    /// Author classification
    pub fn author(&self) -> Author<'_> {
        match self.user_id.as_str() {
            ASSISTANT_USER_ID => Author::Assistant,
            CARD_USER_ID => Author::Card,
            TOOL_USER_ID => Author::Tool,
            other => Author::Member(other),
        }
    }

    /// Text of the first content part when it is plain text
    pub fn text(&self) -> Option<&str> {
        match self.content.first() {
            Some(ContentPart::Text {
                text: TextBody::Plain(t),
            }) => Some(t.as_str()),
            _ => None,
        }
    }

    /// Mutable text of the first content part when it is plain text
    pub fn text_mut(&mut self) -> Option<&mut String> {
        match self.content.first_mut() {
            Some(ContentPart::Text {
                text: TextBody::Plain(t),
            }) => Some(t),
            _ => None,
        }
    }

    /// Paper payload when this is a card
    pub fn paper(&self) -> Option<&Paper> {
        match self.content.first() {
            Some(ContentPart::Text {
                text: TextBody::Card(p),
            }) => Some(p),
            _ => None,
        }
    }

    /// Parsed timestamp; the service omits the timezone, which means UTC
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|d| d.naive_utc())
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok()
    }
}

/// Render a timestamp the way `read-messages?after=` expects it
pub fn format_after(ts: &NaiveDateTime) -> String {
    format!("{}Z", ts.format("%Y-%m-%dT%H:%M:%S%.6f"))
}

/// Body of `POST /api/send-message`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendMessageRequest {
    /// Target project
    pub project_id: super::ProjectId,
    /// Message text
    pub message: String,
    /// Server file ids from earlier uploads
    pub attachments: Vec<String>,
}

/// Response of `POST /api/send-message`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendReceipt {
    /// Status text
    #[serde(default)]
    pub message: Option<String>,
    /// Chat the message landed in
    #[serde(default)]
    pub chat_id: Option<MessageId>,
    /// Id of the stored message
    #[serde(default)]
    pub message_id: Option<MessageId>,
}
