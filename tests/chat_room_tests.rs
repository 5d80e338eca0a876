// Chat room behaviour with in-memory API and realtime fakes

mod common;

use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chatroom::chat::ChatRoom;
use chatroom::conversation::ConversationState;
use chatroom::models::{Identity, ToastKind, UserSummary, WireMessage, MAX_IMAGE_BYTES};
use chatroom::realtime::{OfflineChannel, OutboundEvent, PresenceChange, ServerEvent};
use common::{contact, request, setup_logging, FakeApi, FakeChannel};

fn room_with(api: &Arc<FakeApi>, channel: &Arc<FakeChannel>) -> ChatRoom {
    setup_logging();
    ChatRoom::new(
        Identity {
            username: "alice".to_string(),
        },
        api.clone(),
        channel.clone(),
    )
}

fn wire(content: &str, sender: &str) -> WireMessage {
    WireMessage {
        content: content.to_string(),
        sender_id: Some(sender.to_string()),
        ..WireMessage::default()
    }
}

fn toast(room: &ChatRoom) -> Option<(String, ToastKind)> {
    room.notifier().current().map(|t| (t.message.clone(), t.kind))
}

/// Room with bob and carol loaded and bob's (empty) conversation open.
async fn room_with_bob_open(api: &Arc<FakeApi>, channel: &Arc<FakeChannel>) -> ChatRoom {
    *api.contacts.lock().unwrap() = vec![contact("b", "bob", true), contact("c", "carol", false)];
    let mut room = room_with(api, channel);
    room.load_contacts();
    room.process_next().await;
    room.select_contact(contact("b", "bob", true));
    room.process_next().await;
    room.handle_server_event(ServerEvent::ConversationLoaded { messages: Vec::new() });
    room
}

#[tokio::test]
async fn test_start_loads_contacts_and_requests() {
    let api = FakeApi::new();
    *api.contacts.lock().unwrap() = vec![contact("b", "bob", true)];
    *api.requests.lock().unwrap() = vec![request("r1", "erin")];
    let mut room = room_with(&api, &FakeChannel::new());

    room.start();
    room.process_next().await;
    room.process_next().await;

    assert_eq!(room.panel().contacts().len(), 1);
    assert_eq!(room.panel().requests()[0].sender_username, "erin");
    assert_eq!(api.count("contacts"), 1);
    assert_eq!(api.count("pending_requests"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_short_search_never_hits_the_network() {
    let api = FakeApi::new();
    let mut room = room_with(&api, &FakeChannel::new());

    room.on_search_input("b");
    room.on_search_input("");
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(api.count("search_users"), 0);
    assert!(!room.panel().show_dropdown());
}

#[tokio::test(start_paused = true)]
async fn test_rapid_typing_issues_one_search() {
    let api = FakeApi::new();
    *api.users.lock().unwrap() = vec![
        UserSummary {
            id: "u1".to_string(),
            username: "bob".to_string(),
        },
        UserSummary {
            id: "u2".to_string(),
            username: "bobby".to_string(),
        },
    ];
    let mut room = room_with(&api, &FakeChannel::new());

    room.on_search_input("bo");
    tokio::time::sleep(Duration::from_millis(100)).await;
    room.on_search_input("bob");
    tokio::time::sleep(Duration::from_millis(100)).await;
    room.on_search_input("bobb");
    assert!(room.is_searching());
    room.process_next().await;

    assert_eq!(api.calls(), vec!["search_users:bobb".to_string()]);
    assert!(room.panel().show_dropdown());
    assert_eq!(room.panel().results().len(), 1);

    // Dropping below two characters clears straight away and cancels nothing new
    room.on_search_input("b");
    assert!(!room.is_searching());
    assert!(room.panel().results().is_empty());
    assert!(!room.panel().show_dropdown());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(api.count("search_users"), 1);
}

#[tokio::test]
async fn test_selecting_contact_clears_buffer_first() {
    let api = FakeApi::new();
    let channel = FakeChannel::new();
    let mut room = room_with_bob_open(&api, &channel).await;
    room.handle_server_event(ServerEvent::ConversationLoaded {
        messages: vec![wire("old one", "b"), wire("old two", "b")],
    });
    assert_eq!(room.conversation().messages().len(), 2);

    room.select_contact(contact("c", "carol", false));
    assert!(room.conversation().messages().is_empty());
    assert!(matches!(
        room.conversation().state(),
        ConversationState::Loading { contact } if contact.id == "c"
    ));

    room.process_next().await;
    assert_eq!(
        channel.emitted(),
        vec![
            OutboundEvent::LoadConversation {
                contact_id: "b".to_string()
            },
            OutboundEvent::LoadConversation {
                contact_id: "c".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_message_from_other_contact_is_not_shown() {
    let api = FakeApi::new();
    let channel = FakeChannel::new();
    let mut room = room_with_bob_open(&api, &channel).await;

    room.handle_server_event(ServerEvent::NewMessage(wire("psst", "c")));
    assert!(room.conversation().messages().is_empty());

    room.handle_server_event(ServerEvent::NewMessage(wire("hello alice", "b")));
    let messages = room.conversation().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "hello alice");
    assert!(!messages[0].is_mine);
}

#[tokio::test]
async fn test_sent_text_appears_only_after_acknowledgement() {
    let api = FakeApi::new();
    let channel = FakeChannel::new();
    let mut room = room_with_bob_open(&api, &channel).await;

    assert!(!room.send("   "), "blank input is not sent");
    assert!(room.send(" hi "));
    room.process_next().await;

    assert_eq!(
        channel.emitted().last(),
        Some(&OutboundEvent::SendPrivateMessage {
            recipient_id: "b".to_string(),
            content: "hi".to_string(),
        })
    );
    assert!(room.conversation().messages().is_empty(), "no local echo");

    room.handle_server_event(ServerEvent::MessageSent(wire("hi", "a")));
    let messages = room.conversation().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "hi");
    assert!(messages[0].is_mine);
}

#[tokio::test]
async fn test_send_while_disconnected_shows_error() {
    let api = FakeApi::new();
    let channel = FakeChannel::new();
    let mut room = room_with_bob_open(&api, &channel).await;

    channel.connected.store(false, Ordering::SeqCst);
    room.handle_server_event(ServerEvent::Disconnected);
    assert!(!room.is_connected());

    assert!(room.send("anyone there?"));
    room.process_next().await;
    assert_eq!(
        toast(&room),
        Some(("Not connected to chat server".to_string(), ToastKind::Error))
    );
}

#[tokio::test]
async fn test_removal_denied_changes_nothing() {
    let api = FakeApi::new();
    let channel = FakeChannel::new();
    let mut room = room_with_bob_open(&api, &channel).await;

    assert_eq!(room.request_removal().map(|c| c.username), Some("bob".to_string()));
    assert!(room.pending_removal().is_some());
    room.confirm_removal(false);

    assert!(room.pending_removal().is_none());
    assert_eq!(room.panel().contacts().len(), 2);
    assert_eq!(room.conversation().contact().map(|c| c.id.as_str()), Some("b"));
    assert_eq!(api.count("remove_contact"), 0);
}

#[tokio::test]
async fn test_removal_confirmed() {
    let api = FakeApi::new();
    let channel = FakeChannel::new();
    let mut room = room_with_bob_open(&api, &channel).await;

    room.request_removal();
    room.confirm_removal(true);
    room.process_next().await;

    assert_eq!(api.count("remove_contact"), 1);
    assert_eq!(
        toast(&room),
        Some(("Removed bob and deleted all chats".to_string(), ToastKind::Success))
    );
    assert!(room.conversation().contact().is_none());

    // The contact list is reloaded
    *api.contacts.lock().unwrap() = vec![contact("c", "carol", false)];
    room.process_next().await;
    assert_eq!(room.panel().contacts().len(), 1);
}

#[tokio::test]
async fn test_removal_failure_keeps_selection() {
    let api = FakeApi::new();
    let channel = FakeChannel::new();
    let mut room = room_with_bob_open(&api, &channel).await;
    api.fail_on("remove_contact", None);

    room.request_removal();
    room.confirm_removal(true);
    room.process_next().await;

    assert_eq!(toast(&room), Some(("Failed to remove contact".to_string(), ToastKind::Error)));
    assert!(room.conversation().contact().is_some());
}

#[tokio::test]
async fn test_oversized_image_is_rejected() {
    let api = FakeApi::new();
    let channel = FakeChannel::new();
    let mut room = room_with_bob_open(&api, &channel).await;

    let file = tempfile::NamedTempFile::new().unwrap();
    file.as_file().set_len(MAX_IMAGE_BYTES + 1).unwrap();
    room.stage_image(file.path().to_path_buf());
    room.process_next().await;

    assert_eq!(
        toast(&room),
        Some(("Image must be smaller than 5MB".to_string(), ToastKind::Error))
    );
    assert!(room.conversation().staged_image().is_none());
}

#[tokio::test]
async fn test_image_upload_success_and_failure() {
    let api = FakeApi::new();
    let channel = FakeChannel::new();
    let mut room = room_with_bob_open(&api, &channel).await;

    let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    file.write_all(b"not really a png").unwrap();
    room.stage_image(file.path().to_path_buf());
    room.process_next().await;
    let staged = room.conversation().staged_image().expect("image staged");
    assert!(staged.preview_data_url.starts_with("data:image/png;base64,"));

    // Failure keeps the image staged for a retry
    api.fail_on("upload_image", Some("Upload failed"));
    assert!(room.send("ignored while an image is staged"));
    room.process_next().await;
    assert_eq!(toast(&room), Some(("Failed to send image".to_string(), ToastKind::Error)));
    assert!(room.conversation().staged_image().is_some());

    let api = FakeApi::new();
    let mut room = room_with_bob_open(&api, &channel).await;
    room.stage_image(file.path().to_path_buf());
    room.process_next().await;
    assert!(room.send(""));
    room.process_next().await;
    assert_eq!(toast(&room), Some(("Image sent!".to_string(), ToastKind::Success)));
    assert!(room.conversation().staged_image().is_none());
    assert_eq!(api.count("upload_image"), 1);
    assert!(
        !channel.emitted().iter().any(|e| matches!(e, OutboundEvent::SendPrivateMessage { .. })),
        "images are not sent over the socket"
    );
}

#[tokio::test]
async fn test_contacts_updated_refreshes_or_clears_selection() {
    let api = FakeApi::new();
    let channel = FakeChannel::new();
    let mut room = room_with_bob_open(&api, &channel).await;
    room.handle_server_event(ServerEvent::ConversationLoaded {
        messages: vec![wire("kept", "b")],
    });

    room.handle_server_event(ServerEvent::ContactsUpdated {
        contacts: vec![contact("b", "bob", false), contact("c", "carol", false)],
    });
    let selected = room.conversation().contact().expect("bob still selected");
    assert!(!selected.online);
    assert_eq!(room.conversation().messages().len(), 1, "history is not reloaded");

    room.handle_server_event(ServerEvent::ContactsUpdated {
        contacts: vec![contact("c", "carol", false)],
    });
    assert_eq!(room.conversation().state(), &ConversationState::Empty);
    assert_eq!(room.panel().contacts().len(), 1);
}

#[tokio::test]
async fn test_presence_flips_in_place() {
    let api = FakeApi::new();
    let channel = FakeChannel::new();
    let mut room = room_with_bob_open(&api, &channel).await;

    room.handle_server_event(ServerEvent::UserOffline(PresenceChange {
        user_id: "b".to_string(),
        username: Some("bob".to_string()),
    }));
    assert!(!room.panel().contact("b").unwrap().online);
    assert!(!room.conversation().contact().unwrap().online);

    room.handle_server_event(ServerEvent::UserOnline(PresenceChange {
        user_id: "c".to_string(),
        username: None,
    }));
    assert!(room.panel().contact("c").unwrap().online);
    // Unknown users are ignored
    room.handle_server_event(ServerEvent::UserOnline(PresenceChange {
        user_id: "zz".to_string(),
        username: None,
    }));
    assert_eq!(room.panel().contacts().len(), 2);
}

#[tokio::test]
async fn test_contact_removed_by_peer() {
    let api = FakeApi::new();
    let channel = FakeChannel::new();
    let mut room = room_with_bob_open(&api, &channel).await;

    room.handle_server_event(ServerEvent::ContactRemoved {
        removed_by_id: "b".to_string(),
        removed_by_username: "bob".to_string(),
    });
    assert_eq!(
        toast(&room),
        Some(("bob removed you from their contacts".to_string(), ToastKind::Info))
    );
    assert!(room.conversation().contact().is_none());
}

#[tokio::test]
async fn test_friend_request_events() {
    let api = FakeApi::new();
    *api.requests.lock().unwrap() = vec![request("r9", "frank")];
    let mut room = room_with(&api, &FakeChannel::new());

    room.handle_server_event(ServerEvent::FriendRequestReceived {
        sender_username: "frank".to_string(),
    });
    assert_eq!(toast(&room), Some(("Friend request from frank".to_string(), ToastKind::Info)));
    room.process_next().await;
    assert_eq!(room.panel().requests().len(), 1);

    room.handle_server_event(ServerEvent::FriendRequestAccepted {
        accepter_username: "gina".to_string(),
    });
    assert_eq!(
        toast(&room),
        Some(("gina accepted your friend request!".to_string(), ToastKind::Success))
    );

    room.handle_server_event(ServerEvent::Error {
        message: "Recipient not found".to_string(),
    });
    assert_eq!(toast(&room), Some(("Recipient not found".to_string(), ToastKind::Error)));
}

#[tokio::test]
async fn test_send_friend_request_outcomes() {
    let api = FakeApi::new();
    let mut room = room_with(&api, &FakeChannel::new());

    room.panel_mut().on_query_changed("bo");
    room.send_friend_request("bob");
    room.process_next().await;
    assert_eq!(toast(&room), Some(("Friend request sent to bob".to_string(), ToastKind::Success)));
    assert_eq!(room.panel().query(), "");

    api.fail_on("send_friend_request", Some("User not found"));
    room.send_friend_request("ghost");
    room.process_next().await;
    assert_eq!(toast(&room), Some(("User not found".to_string(), ToastKind::Error)));

    api.fail_on("send_friend_request", None);
    room.send_friend_request("ghost");
    room.process_next().await;
    assert_eq!(toast(&room), Some(("Failed to send request".to_string(), ToastKind::Error)));
}

#[tokio::test]
async fn test_accept_and_reject_requests() {
    let api = FakeApi::new();
    let mut room = room_with(&api, &FakeChannel::new());

    room.accept_request(&request("r1", "erin"));
    room.process_next().await;
    assert_eq!(toast(&room), Some(("You and erin are now friends!".to_string(), ToastKind::Success)));
    // Requests and contacts are both re-fetched
    room.process_next().await;
    room.process_next().await;
    assert_eq!(api.count("pending_requests"), 1);
    assert_eq!(api.count("contacts"), 1);

    room.reject_request(&request("r2", "mallory"));
    room.process_next().await;
    assert_eq!(toast(&room), Some(("Friend request rejected".to_string(), ToastKind::Info)));
    // Rejecting also re-fetches both lists
    room.process_next().await;
    room.process_next().await;
    assert_eq!(api.count("pending_requests"), 2);
    assert_eq!(api.count("contacts"), 2);

    api.fail_on("accept_request", None);
    api.fail_on("reject_request", None);
    room.accept_request(&request("r3", "trent"));
    room.process_next().await;
    assert_eq!(toast(&room), Some(("Failed to accept request".to_string(), ToastKind::Error)));
    room.reject_request(&request("r3", "trent"));
    room.process_next().await;
    assert_eq!(toast(&room), Some(("Failed to reject request".to_string(), ToastKind::Error)));
}

#[tokio::test]
async fn test_toast_expires_on_tick() {
    let api = FakeApi::new();
    let mut room = room_with(&api, &FakeChannel::new());
    room.handle_server_event(ServerEvent::Error {
        message: "boom".to_string(),
    });

    room.tick(Instant::now() + Duration::from_secs(1));
    assert!(toast(&room).is_some());
    room.tick(Instant::now() + Duration::from_secs(4));
    assert!(toast(&room).is_none());

    room.handle_server_event(ServerEvent::Error {
        message: "again".to_string(),
    });
    room.dismiss_toast();
    assert!(toast(&room).is_none());
}

#[tokio::test]
async fn test_offline_room_keeps_rest_features() {
    setup_logging();
    let api = FakeApi::new();
    *api.contacts.lock().unwrap() = vec![contact("b", "bob", true)];
    let mut room = ChatRoom::new(
        Identity {
            username: "alice".to_string(),
        },
        api.clone(),
        Arc::new(OfflineChannel),
    );
    assert!(!room.is_connected());

    room.load_contacts();
    room.process_next().await;
    assert_eq!(room.panel().contacts().len(), 1);

    room.select_contact(contact("b", "bob", true));
    room.process_next().await;
    assert_eq!(
        toast(&room),
        Some(("Not connected to chat server".to_string(), ToastKind::Error))
    );

    room.reject_request(&request("r1", "erin"));
    room.process_next().await;
    assert_eq!(toast(&room), Some(("Friend request rejected".to_string(), ToastKind::Info)));
}

#[tokio::test]
async fn test_unauthorized_response_expires_session() {
    let api = FakeApi::new();
    let mut room = room_with(&api, &FakeChannel::new());

    api.fail_on("contacts", None);
    room.load_contacts();
    room.process_next().await;
    assert!(!room.session_expired(), "other failures keep the session");

    api.fail_with("contacts", 401, Some("Unauthorized"));
    room.load_contacts();
    room.process_next().await;
    assert!(room.session_expired());
}
