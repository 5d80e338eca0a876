// Chat room coordinator
// Owns the panel, conversation and notifier state for one logged-in session.
// Network work runs on spawned tasks; results come back as `Completion`s and
// are applied on the caller's loop, so drawing never waits on the network.

use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::api::ChatApi;
use crate::contacts::{ContactPanel, SearchPlan};
use crate::conversation::{ConversationView, SendPlan, StagedImage};
use crate::debounce::{Debouncer, SEARCH_DEBOUNCE};
use crate::error::{ClientError, ClientResult};
use crate::models::{Contact, FriendRequest, Identity, ToastKind, UserSummary};
use crate::notify::Notifier;
use crate::realtime::{OutboundEvent, RealtimeSender, ServerEvent};

/// Outcome of a spawned network or file operation.
#[derive(Debug)]
pub enum Completion {
    ContactsLoaded(ClientResult<Vec<Contact>>),
    RequestsLoaded(ClientResult<Vec<FriendRequest>>),
    SearchResults { query: String, result: ClientResult<Vec<UserSummary>> },
    FriendRequestSent { username: String, result: ClientResult<()> },
    RequestAccepted { username: String, result: ClientResult<()> },
    RequestRejected { result: ClientResult<()> },
    ImageStaged(ClientResult<StagedImage>),
    ImageUploaded(ClientResult<()>),
    ContactRemoved { contact: Contact, result: ClientResult<()> },
    Emitted { event: &'static str, result: ClientResult<()> },
}

impl Completion {
    fn error(&self) -> Option<&ClientError> {
        match self {
            Completion::ContactsLoaded(Err(e))
            | Completion::RequestsLoaded(Err(e))
            | Completion::ImageStaged(Err(e))
            | Completion::ImageUploaded(Err(e))
            | Completion::SearchResults { result: Err(e), .. }
            | Completion::FriendRequestSent { result: Err(e), .. }
            | Completion::RequestAccepted { result: Err(e), .. }
            | Completion::RequestRejected { result: Err(e) }
            | Completion::ContactRemoved { result: Err(e), .. }
            | Completion::Emitted { result: Err(e), .. } => Some(e),
            _ => None,
        }
    }
}

pub struct ChatRoom {
    identity: Identity,
    api: Arc<dyn ChatApi>,
    channel: Arc<dyn RealtimeSender>,
    panel: ContactPanel,
    conversation: ConversationView,
    notifier: Notifier,
    search: Debouncer,
    connected: bool,
    session_expired: bool,
    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: mpsc::UnboundedReceiver<Completion>,
}

impl ChatRoom {
    pub fn new(identity: Identity, api: Arc<dyn ChatApi>, channel: Arc<dyn RealtimeSender>) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let connected = channel.is_connected();
        ChatRoom {
            identity,
            api,
            channel,
            panel: ContactPanel::new(),
            conversation: ConversationView::new(),
            notifier: Notifier::new(),
            search: Debouncer::new(SEARCH_DEBOUNCE),
            connected,
            session_expired: false,
            done_tx,
            done_rx,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn panel(&self) -> &ContactPanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut ContactPanel {
        &mut self.panel
    }

    pub fn conversation(&self) -> &ConversationView {
        &self.conversation
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Set once the server answers 401: the cookie session is gone.
    pub fn session_expired(&self) -> bool {
        self.session_expired
    }

    /// A user search is waiting out the debounce or still in flight.
    pub fn is_searching(&self) -> bool {
        self.search.is_pending()
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.notifier.show(message, kind);
    }

    /// Initial load of contacts and pending requests.
    pub fn start(&self) {
        self.load_contacts();
        self.load_requests();
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = Completion> + Send + 'static,
    {
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let completion = task.await;
            if done_tx.send(completion).is_err() {
                debug!("Chat room gone, dropping completion");
            }
        });
    }

    fn emit(&self, event: OutboundEvent) {
        let channel = self.channel.clone();
        self.spawn(async move {
            let name = event.name();
            Completion::Emitted {
                event: name,
                result: channel.emit(event).await,
            }
        });
    }

    pub fn load_contacts(&self) {
        let api = self.api.clone();
        self.spawn(async move { Completion::ContactsLoaded(api.contacts().await) });
    }

    pub fn load_requests(&self) {
        let api = self.api.clone();
        self.spawn(async move { Completion::RequestsLoaded(api.pending_requests().await) });
    }

    /// Called on every edit of the search box. The pending search is always
    /// cancelled; a new one is scheduled only for queries of 2+ characters.
    pub fn on_search_input(&mut self, query: &str) {
        self.search.cancel();
        match self.panel.on_query_changed(query) {
            SearchPlan::Cleared => {}
            SearchPlan::Scheduled(query) => {
                let api = self.api.clone();
                let done_tx = self.done_tx.clone();
                self.search.schedule(async move {
                    let result = api.search_users(&query).await;
                    let _ = done_tx.send(Completion::SearchResults { query, result });
                });
            }
        }
    }

    pub fn send_friend_request(&self, username: &str) {
        let api = self.api.clone();
        let username = username.to_string();
        self.spawn(async move {
            let result = api.send_friend_request(&username).await;
            Completion::FriendRequestSent { username, result }
        });
    }

    pub fn accept_request(&self, request: &FriendRequest) {
        let api = self.api.clone();
        let request_id = request.id.clone();
        let username = request.sender_username.clone();
        self.spawn(async move {
            let result = api.accept_request(&request_id).await;
            Completion::RequestAccepted { username, result }
        });
    }

    pub fn reject_request(&self, request: &FriendRequest) {
        let api = self.api.clone();
        let request_id = request.id.clone();
        self.spawn(async move {
            Completion::RequestRejected {
                result: api.reject_request(&request_id).await,
            }
        });
    }

    /// Open the conversation with `contact`; the buffer is cleared at once.
    pub fn select_contact(&mut self, contact: Contact) {
        let event = self.conversation.select(contact);
        self.emit(event);
    }

    pub fn stage_image(&self, path: PathBuf) {
        self.spawn(async move { Completion::ImageStaged(StagedImage::load(&path).await) });
    }

    pub fn unstage_image(&mut self) {
        self.conversation.unstage_image();
    }

    /// Send the composer contents. Returns true when the input box should be cleared.
    pub fn send(&mut self, input: &str) -> bool {
        match self.conversation.prepare_send(input) {
            SendPlan::Nothing => false,
            SendPlan::Text(event) => {
                self.emit(event);
                true
            }
            SendPlan::Image { recipient_id, image } => {
                let api = self.api.clone();
                self.spawn(async move {
                    Completion::ImageUploaded(
                        api.upload_image(&recipient_id, &image.file_name, image.bytes).await,
                    )
                });
                true
            }
        }
    }

    /// First step of removing the selected contact. Returns the contact awaiting confirmation.
    pub fn request_removal(&mut self) -> Option<Contact> {
        self.conversation.request_removal().cloned()
    }

    pub fn pending_removal(&self) -> Option<&Contact> {
        self.conversation.pending_removal()
    }

    pub fn confirm_removal(&mut self, confirmed: bool) {
        if let Some(contact) = self.conversation.confirm_removal(confirmed) {
            let api = self.api.clone();
            self.spawn(async move {
                let result = api.remove_contact(&contact.id).await;
                Completion::ContactRemoved { contact, result }
            });
        }
    }

    pub fn dismiss_toast(&mut self) {
        self.notifier.dismiss();
    }

    pub fn tick(&mut self, now: Instant) {
        self.notifier.tick(now);
    }

    pub fn handle_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Connected => {
                self.connected = true;
            }
            ServerEvent::Disconnected => {
                warn!("Realtime channel lost");
                self.connected = false;
            }
            ServerEvent::ConversationLoaded { messages } => {
                info!("Loaded {} messages", messages.len());
                self.conversation.on_conversation_loaded(messages);
            }
            ServerEvent::MessageSent(message) => self.conversation.on_message_sent(message),
            ServerEvent::NewMessage(message) => self.conversation.on_new_message(message),
            ServerEvent::FriendRequestReceived { sender_username } => {
                self.notifier
                    .show(format!("Friend request from {}", sender_username), ToastKind::Info);
                self.load_requests();
            }
            ServerEvent::FriendRequestAccepted { accepter_username } => {
                self.notifier.show(
                    format!("{} accepted your friend request!", accepter_username),
                    ToastKind::Success,
                );
            }
            ServerEvent::ContactsUpdated { contacts } => {
                self.panel.set_contacts(contacts);
                self.sync_selection();
            }
            ServerEvent::ContactRemoved {
                removed_by_id,
                removed_by_username,
            } => {
                self.notifier.show(
                    format!("{} removed you from their contacts", removed_by_username),
                    ToastKind::Info,
                );
                if self.conversation.contact().map(|c| c.id == removed_by_id).unwrap_or(false) {
                    self.conversation.clear();
                }
            }
            ServerEvent::UserOnline(change) => self.set_presence(&change.user_id, true),
            ServerEvent::UserOffline(change) => self.set_presence(&change.user_id, false),
            ServerEvent::Error { message } => {
                self.notifier.show(message, ToastKind::Error);
            }
        }
    }

    fn set_presence(&mut self, user_id: &str, online: bool) {
        if let Some(updated) = self.panel.set_online(user_id, online) {
            self.conversation.update_contact(&updated);
        }
    }

    /// Keep the selected contact in step with a fresh contact list.
    fn sync_selection(&mut self) {
        let selected_id = match self.conversation.contact() {
            Some(contact) => contact.id.clone(),
            None => return,
        };
        match self.panel.contact(&selected_id).cloned() {
            Some(updated) => self.conversation.update_contact(&updated),
            None => {
                info!("Selected contact no longer in list, clearing conversation");
                self.conversation.clear();
            }
        }
    }

    pub fn apply_completion(&mut self, completion: Completion) {
        if completion.error().map_or(false, ClientError::is_unauthorized) {
            warn!("Server rejected the session cookie");
            self.session_expired = true;
        }
        match completion {
            Completion::ContactsLoaded(Ok(contacts)) => {
                self.panel.set_contacts(contacts);
                self.sync_selection();
            }
            Completion::ContactsLoaded(Err(e)) => error!("Failed to load contacts: {}", e),
            Completion::RequestsLoaded(Ok(requests)) => self.panel.set_requests(requests),
            Completion::RequestsLoaded(Err(e)) => error!("Failed to load friend requests: {}", e),
            Completion::SearchResults { query, result } => match result {
                Ok(users) => self.panel.apply_search_results(&query, users),
                Err(e) => error!("Search error: {}", e),
            },
            Completion::FriendRequestSent { username, result } => match result {
                Ok(()) => {
                    self.notifier
                        .show(format!("Friend request sent to {}", username), ToastKind::Success);
                    self.search.cancel();
                    self.panel.clear_search();
                }
                Err(e) => {
                    self.notifier
                        .show(e.user_message("Failed to send request"), ToastKind::Error);
                }
            },
            Completion::RequestAccepted { username, result } => match result {
                Ok(()) => {
                    self.notifier
                        .show(format!("You and {} are now friends!", username), ToastKind::Success);
                    self.load_requests();
                    self.load_contacts();
                }
                Err(e) => {
                    error!("Accept failed: {}", e);
                    self.notifier.show("Failed to accept request", ToastKind::Error);
                }
            },
            Completion::RequestRejected { result } => match result {
                Ok(()) => {
                    self.notifier.show("Friend request rejected", ToastKind::Info);
                    self.load_requests();
                    self.load_contacts();
                }
                Err(e) => {
                    error!("Reject failed: {}", e);
                    self.notifier.show("Failed to reject request", ToastKind::Error);
                }
            },
            Completion::ImageStaged(result) => match result {
                Ok(image) => self.conversation.stage_image(image),
                Err(e) => {
                    self.notifier
                        .show(e.user_message("Could not read image"), ToastKind::Error);
                }
            },
            Completion::ImageUploaded(result) => match result {
                Ok(()) => {
                    self.notifier.show("Image sent!", ToastKind::Success);
                    self.conversation.unstage_image();
                }
                Err(e) => {
                    error!("Image upload failed: {}", e);
                    self.notifier.show("Failed to send image", ToastKind::Error);
                }
            },
            Completion::ContactRemoved { contact, result } => match result {
                Ok(()) => {
                    self.notifier.show(
                        format!("Removed {} and deleted all chats", contact.username),
                        ToastKind::Success,
                    );
                    if self.conversation.contact().map(|c| c.id == contact.id).unwrap_or(false) {
                        self.conversation.clear();
                    }
                    self.load_contacts();
                }
                Err(e) => {
                    error!("Remove contact failed: {}", e);
                    self.notifier.show("Failed to remove contact", ToastKind::Error);
                }
            },
            Completion::Emitted { event, result } => {
                if let Err(e) = result {
                    error!("Failed to emit {}: {}", event, e);
                    self.notifier.show("Not connected to chat server", ToastKind::Error);
                }
            }
        }
    }

    /// Apply every completion that is already available. Returns how many were applied.
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.done_rx.try_recv() {
            self.apply_completion(completion);
            applied += 1;
        }
        applied
    }

    /// Wait for the next completion and apply it.
    pub async fn process_next(&mut self) -> bool {
        match self.done_rx.recv().await {
            Some(completion) => {
                self.apply_completion(completion);
                true
            }
            None => false,
        }
    }
}
