use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest image the composer will stage, in bytes (5MB).
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Minimum password length enforced before any login/signup request.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Minimum query length before a user search is issued.
pub const MIN_SEARCH_LEN: usize = 2;

/// Maximum length of a composed text message.
pub const MAX_MESSAGE_LEN: usize = 500;

/// The logged-in user as far as this client knows.
///
/// Only the username is kept; the real session lives in a server-side cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub online: bool,
}

/// A row in the user search dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: String,
    pub sender_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
}

/// A message in the active conversation buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub content: String,
    pub is_mine: bool,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
}

impl Message {
    pub fn text(content: &str, is_mine: bool) -> Self {
        Message {
            content: content.to_string(),
            is_mine,
            timestamp: Utc::now(),
            kind: MessageKind::Text,
        }
    }
}

/// Message shape used by the server in `conversation_loaded`, `message_sent`
/// and `new_message` payloads. Only `content` is guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub is_mine: bool,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
}

impl WireMessage {
    /// Convert into a buffer entry. `is_mine` overrides the payload flag since
    /// the event name already tells us the direction.
    pub fn into_message(self, is_mine: Option<bool>) -> Message {
        let timestamp = self
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        Message {
            content: self.content,
            is_mine: is_mine.unwrap_or(self.is_mine),
            timestamp,
            kind: self.kind,
        }
    }
}

/// Parse a server timestamp. The server emits naive UTC ISO strings
/// (`2024-05-01T10:00:00.123456`) but RFC 3339 is accepted too.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    pub fn icon(self) -> &'static str {
        match self {
            ToastKind::Success => "✅",
            ToastKind::Error => "❌",
            ToastKind::Info => "ℹ️",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}
