// Conversation view: message buffer for the selected contact plus the composer

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::api::image_mime;
use crate::error::{ClientError, ClientResult};
use crate::models::{Contact, Message, WireMessage, MAX_IMAGE_BYTES};
use crate::realtime::OutboundEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum ConversationState {
    /// No contact selected
    Empty,
    /// History requested, buffer cleared
    Loading { contact: Contact },
    /// History received; new messages are appended
    Active { contact: Contact, messages: Vec<Message> },
}

/// An image picked for sending, with a data URL preview of its bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedImage {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub bytes: Vec<u8>,
    pub preview_data_url: String,
}

impl StagedImage {
    /// Read an image from disk for staging.
    ///
    /// Files over 5MB are rejected from their metadata, before any read.
    pub async fn load(path: &Path) -> ClientResult<Self> {
        let size = tokio::fs::metadata(path).await?.len();
        if size > MAX_IMAGE_BYTES {
            info!("Rejecting {} ({} bytes): too large", path.display(), size);
            return Err(ClientError::Validation("Image must be smaller than 5MB".to_string()));
        }
        let bytes = tokio::fs::read(path).await?;
        let preview_data_url = format!("data:{};base64,{}", image_mime(path), BASE64.encode(&bytes));
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(StagedImage {
            path: path.to_path_buf(),
            file_name,
            size: bytes.len() as u64,
            bytes,
            preview_data_url,
        })
    }
}

/// What pressing send should do.
#[derive(Debug, Clone, PartialEq)]
pub enum SendPlan {
    Nothing,
    Text(OutboundEvent),
    Image { recipient_id: String, image: StagedImage },
}

pub struct ConversationView {
    state: ConversationState,
    staged: Option<StagedImage>,
    pending_removal: Option<Contact>,
}

impl Default for ConversationView {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationView {
    pub fn new() -> Self {
        ConversationView {
            state: ConversationState::Empty,
            staged: None,
            pending_removal: None,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn contact(&self) -> Option<&Contact> {
        match &self.state {
            ConversationState::Empty => None,
            ConversationState::Loading { contact } | ConversationState::Active { contact, .. } => Some(contact),
        }
    }

    pub fn messages(&self) -> &[Message] {
        match &self.state {
            ConversationState::Active { messages, .. } => messages.as_slice(),
            ConversationState::Empty | ConversationState::Loading { .. } => &[],
        }
    }

    /// Switch to `contact`: the buffer is cleared before the history request
    /// is returned for sending.
    pub fn select(&mut self, contact: Contact) -> OutboundEvent {
        debug!("Selecting conversation with {}", contact.username);
        let contact_id = contact.id.clone();
        self.state = ConversationState::Loading { contact };
        self.pending_removal = None;
        OutboundEvent::LoadConversation { contact_id }
    }

    pub fn clear(&mut self) {
        self.state = ConversationState::Empty;
        self.pending_removal = None;
    }

    /// Refresh presence or name of the selected contact without reloading.
    pub fn update_contact(&mut self, updated: &Contact) {
        match &mut self.state {
            ConversationState::Loading { contact } | ConversationState::Active { contact, .. } => {
                if contact.id == updated.id {
                    *contact = updated.clone();
                }
            }
            ConversationState::Empty => {}
        }
    }

    /// Bulk replace with the loaded history.
    pub fn on_conversation_loaded(&mut self, history: Vec<WireMessage>) {
        let contact = match std::mem::replace(&mut self.state, ConversationState::Empty) {
            ConversationState::Empty => {
                debug!("History arrived with no contact selected, ignoring");
                return;
            }
            ConversationState::Loading { contact } | ConversationState::Active { contact, .. } => contact,
        };
        let messages = history.into_iter().map(|m| m.into_message(None)).collect();
        self.state = ConversationState::Active { contact, messages };
    }

    /// The server persisted one of our messages.
    pub fn on_message_sent(&mut self, message: WireMessage) {
        self.append(message.into_message(Some(true)));
    }

    /// A message pushed by a peer; kept only if it comes from the selected contact.
    pub fn on_new_message(&mut self, message: WireMessage) {
        let from_selected = match (self.contact(), message.sender_id.as_deref()) {
            (Some(contact), Some(sender)) => contact.id == sender,
            _ => false,
        };
        if !from_selected {
            debug!("Dropping message from {:?}: not the selected contact", message.sender_id);
            return;
        }
        self.append(message.into_message(Some(false)));
    }

    fn append(&mut self, message: Message) {
        match std::mem::replace(&mut self.state, ConversationState::Empty) {
            ConversationState::Empty => {}
            ConversationState::Loading { contact } => {
                self.state = ConversationState::Active {
                    contact,
                    messages: vec![message],
                };
            }
            ConversationState::Active { contact, mut messages } => {
                messages.push(message);
                self.state = ConversationState::Active { contact, messages };
            }
        }
    }

    pub fn staged_image(&self) -> Option<&StagedImage> {
        self.staged.as_ref()
    }

    pub fn stage_image(&mut self, image: StagedImage) {
        self.staged = Some(image);
    }

    pub fn unstage_image(&mut self) {
        self.staged = None;
    }

    /// Decide what to send. A staged image takes precedence over text;
    /// text is trimmed and must be non-empty.
    pub fn prepare_send(&self, input: &str) -> SendPlan {
        let contact = match self.contact() {
            Some(contact) => contact,
            None => return SendPlan::Nothing,
        };
        if let Some(image) = &self.staged {
            return SendPlan::Image {
                recipient_id: contact.id.clone(),
                image: image.clone(),
            };
        }
        let content = input.trim();
        if content.is_empty() {
            return SendPlan::Nothing;
        }
        SendPlan::Text(OutboundEvent::SendPrivateMessage {
            recipient_id: contact.id.clone(),
            content: content.to_string(),
        })
    }

    /// Ask for confirmation before removing the selected contact.
    pub fn request_removal(&mut self) -> Option<&Contact> {
        self.pending_removal = self.contact().cloned();
        self.pending_removal.as_ref()
    }

    pub fn pending_removal(&self) -> Option<&Contact> {
        self.pending_removal.as_ref()
    }

    /// Resolve the confirmation; returns the contact to remove if confirmed.
    pub fn confirm_removal(&mut self, confirmed: bool) -> Option<Contact> {
        let contact = self.pending_removal.take()?;
        if confirmed {
            Some(contact)
        } else {
            debug!("Removal of {} cancelled", contact.username);
            None
        }
    }
}
