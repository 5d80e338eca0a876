// Typed realtime events exchanged with the server

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ClientResult;
use crate::models::{Contact, WireMessage};

/// Events this client emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    LoadConversation { contact_id: String },
    SendPrivateMessage { recipient_id: String, content: String },
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::LoadConversation { .. } => "load_conversation",
            OutboundEvent::SendPrivateMessage { .. } => "send_private_message",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            OutboundEvent::LoadConversation { contact_id } => json!({ "contact_id": contact_id }),
            OutboundEvent::SendPrivateMessage { recipient_id, content } => {
                json!({ "recipient_id": recipient_id, "content": content })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PresenceChange {
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Events pushed by the server, plus local connection-state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Connected,
    Disconnected,
    ConversationLoaded { messages: Vec<WireMessage> },
    MessageSent(WireMessage),
    NewMessage(WireMessage),
    FriendRequestReceived { sender_username: String },
    FriendRequestAccepted { accepter_username: String },
    ContactsUpdated { contacts: Vec<Contact> },
    ContactRemoved { removed_by_id: String, removed_by_username: String },
    UserOnline(PresenceChange),
    UserOffline(PresenceChange),
    Error { message: String },
}

#[derive(Deserialize)]
struct MessagesPayload {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Deserialize)]
struct SenderPayload {
    sender_username: String,
}

#[derive(Deserialize)]
struct AccepterPayload {
    accepter_username: String,
}

#[derive(Deserialize)]
struct ContactsPayload {
    #[serde(default)]
    contacts: Vec<Contact>,
}

#[derive(Deserialize)]
struct RemovedPayload {
    removed_by_id: String,
    #[serde(default)]
    removed_by_username: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
}

impl ServerEvent {
    /// Decode a named event. Unknown names give `Ok(None)`.
    pub fn from_named(name: &str, data: Value) -> ClientResult<Option<Self>> {
        let event = match name {
            "conversation_loaded" => {
                let payload: MessagesPayload = serde_json::from_value(data)?;
                ServerEvent::ConversationLoaded { messages: payload.messages }
            }
            "message_sent" => ServerEvent::MessageSent(serde_json::from_value(data)?),
            "new_message" => ServerEvent::NewMessage(serde_json::from_value(data)?),
            "friend_request_received" => {
                let payload: SenderPayload = serde_json::from_value(data)?;
                ServerEvent::FriendRequestReceived { sender_username: payload.sender_username }
            }
            "friend_request_accepted" => {
                let payload: AccepterPayload = serde_json::from_value(data)?;
                ServerEvent::FriendRequestAccepted { accepter_username: payload.accepter_username }
            }
            "contacts_updated" => {
                let payload: ContactsPayload = serde_json::from_value(data)?;
                ServerEvent::ContactsUpdated { contacts: payload.contacts }
            }
            "contact_removed" => {
                let payload: RemovedPayload = serde_json::from_value(data)?;
                ServerEvent::ContactRemoved {
                    removed_by_id: payload.removed_by_id,
                    removed_by_username: payload.removed_by_username,
                }
            }
            "user_online" => ServerEvent::UserOnline(serde_json::from_value(data)?),
            "user_offline" => ServerEvent::UserOffline(serde_json::from_value(data)?),
            "error" => {
                let payload: ErrorPayload = serde_json::from_value(data)?;
                ServerEvent::Error { message: payload.message }
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}
