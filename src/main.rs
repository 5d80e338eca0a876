use anyhow::Result;
use clap::Parser;
use log::{debug, error, info, warn};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

mod config;
mod ui;
mod utils;

use crate::config::Args;
use crate::ui::{AuthAction, AuthForm, AuthMode, ChatUI, UiAction};
use chatroom::{
    api::{ApiClient, ChatApi},
    chat::ChatRoom,
    identity::{get_config_dir, set_config_dir_override, FileIdentityCache},
    models::{Identity, ToastKind},
    realtime::{OfflineChannel, RealtimeClient, RealtimeSender, ServerEvent},
    session::SessionStore,
};

type Term = ui::Terminal<ui::CrosstermBackend<io::Stdout>>;

/// How a chat session ended.
enum Exit {
    Quit,
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(dir) = &args.config_dir {
        set_config_dir_override(dir.clone());
    }
    let config_dir = get_config_dir()?;
    let log_file_path = config_dir.join("chatroom.log");
    utils::setup_logging(&log_file_path, args.log_level)?;

    info!("Chatroom client starting up");
    info!("System information: {} {}", std::env::consts::OS, std::env::consts::ARCH);
    info!("Logging to file: {}", log_file_path.display());
    info!("Server: {}", args.server);

    let api = Arc::new(ApiClient::with_cookie_dir(&args.server, &config_dir)?);
    let cache = Arc::new(FileIdentityCache::in_config_dir()?);
    let mut session = SessionStore::new(api.clone(), cache);

    let mut terminal = ui::setup_terminal()?;
    let result = run(&mut terminal, &mut session, &api, &args).await;
    ui::restore_terminal(terminal)?;

    if let Err(e) = &result {
        error!("Client stopped with error: {}", e);
        eprintln!("Error: {}", e);
    } else {
        println!("Chat session ended.");
    }
    result
}

/// Auth screen, then chat screen, until the user quits.
async fn run(terminal: &mut Term, session: &mut SessionStore, api: &ApiClient, args: &Args) -> Result<()> {
    loop {
        let identity = match session.check_auth_status().await.cloned() {
            Some(identity) => {
                info!("Resuming session for {}", identity.username);
                identity
            }
            None => match run_auth_screen(terminal, session, args.username.as_deref()).await? {
                Some(identity) => identity,
                None => return Ok(()),
            },
        };

        // Without the socket the REST side still works; the room starts disconnected
        let (realtime, events) = match RealtimeClient::connect(api.base_url(), api.cookie_header().as_deref()).await {
            Ok((client, events)) => {
                info!("Realtime session {} established", client.sid());
                (Some(Arc::new(client)), events)
            }
            Err(e) => {
                error!("Realtime connection failed: {}", e);
                let (_, events) = mpsc::channel(1);
                (None, events)
            }
        };
        let channel: Arc<dyn RealtimeSender> = match &realtime {
            Some(client) => client.clone(),
            None => Arc::new(OfflineChannel),
        };

        let room_api: Arc<dyn ChatApi> = Arc::new(api.clone());
        let mut room = ChatRoom::new(identity, room_api, channel);
        if realtime.is_none() {
            room.notify("Could not connect to chat server", ToastKind::Error);
        }
        room.start();

        let exit = run_main_loop(terminal, &mut room, events).await;
        if let Some(client) = &realtime {
            client.disconnect().await;
        }

        match exit? {
            Exit::Quit => return Ok(()),
            Exit::Logout => {
                session.logout().await;
                info!("Logged out");
            }
        }
    }
}

/// Returns the identity once logged in, or None if the user quit.
async fn run_auth_screen(terminal: &mut Term, session: &mut SessionStore, prefill: Option<&str>) -> Result<Option<Identity>> {
    let mut form = AuthForm::new(prefill);
    loop {
        terminal.draw(|f| form.draw(f))?;
        let (mode, username, password) = match form.handle_input()? {
            None => continue,
            Some(AuthAction::Quit) => return Ok(None),
            Some(AuthAction::Submit { mode, username, password }) => (mode, username, password),
        };

        form.set_processing(true);
        terminal.draw(|f| form.draw(f))?;

        match mode {
            AuthMode::Login => match session.login(&username, &password).await {
                Ok(identity) => return Ok(Some(identity)),
                Err(e) => {
                    form.set_processing(false);
                    form.set_error(e.user_message("Invalid credentials"));
                }
            },
            AuthMode::Signup => match session.signup(&username, &password).await {
                Ok(()) => {
                    form.set_processing(false);
                    form.signup_done();
                }
                Err(e) => {
                    form.set_processing(false);
                    form.set_error(e.user_message("Username already taken"));
                }
            },
        }
    }
}

async fn run_main_loop(terminal: &mut Term, room: &mut ChatRoom, mut events: mpsc::Receiver<ServerEvent>) -> Result<Exit> {
    let mut chat_ui = ChatUI::new();

    loop {
        terminal.draw(|f| chat_ui.draw(f, room))?;

        if let Some(action) = chat_ui.handle_input(room)? {
            match action {
                UiAction::Quit => return Ok(Exit::Quit),
                UiAction::Logout => return Ok(Exit::Logout),
                UiAction::SearchChanged(query) => room.on_search_input(&query),
                UiAction::SendFriendRequest(username) => room.send_friend_request(&username),
                UiAction::AcceptRequest(request) => room.accept_request(&request),
                UiAction::RejectRequest(request) => room.reject_request(&request),
                UiAction::SelectContact(contact) => room.select_contact(contact),
                UiAction::SelectNext(list) => room.panel_mut().select_next(list),
                UiAction::SelectPrev(list) => room.panel_mut().select_prev(list),
                UiAction::Send(input) => {
                    if room.send(&input) {
                        chat_ui.clear_message_input();
                    }
                }
                UiAction::StageImage(path) => room.stage_image(path),
                UiAction::UnstageImage => room.unstage_image(),
                UiAction::RequestRemoval => {
                    if room.request_removal().is_none() {
                        debug!("No contact selected to remove");
                    }
                }
                UiAction::ConfirmRemoval(confirmed) => room.confirm_removal(confirmed),
                UiAction::DismissToast => room.dismiss_toast(),
            }
        }

        loop {
            match events.try_recv() {
                Ok(event) => room.handle_server_event(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if room.is_connected() {
                        warn!("Realtime event stream ended");
                        room.handle_server_event(ServerEvent::Disconnected);
                    }
                    break;
                }
            }
        }

        room.drain_completions();
        if room.session_expired() {
            warn!("Session expired, returning to login");
            return Ok(Exit::Logout);
        }
        chat_ui.sync_search(room.panel().query());
        room.tick(Instant::now());
    }
}
