use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::debug;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::{io, path::PathBuf, time::Duration};
use textwrap::wrap;
use tui_input::{backend::crossterm::EventHandler, Input};

use chatroom::{
    chat::ChatRoom,
    contacts::PanelList,
    conversation::ConversationState,
    models::{Contact, FriendRequest, Message, MessageKind, Toast, ToastKind, MAX_MESSAGE_LEN},
};

use crate::utils::format_clock;

pub use ratatui::backend::CrosstermBackend;
pub use ratatui::Terminal;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Poll crossterm once and return a key press, if any.
fn poll_key() -> Result<Option<KeyEvent>> {
    if event::poll(POLL_INTERVAL)? {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(Some(key));
            }
        }
    }
    Ok(None)
}

fn ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(c)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

pub enum AuthAction {
    Submit {
        mode: AuthMode,
        username: String,
        password: String,
    },
    Quit,
}

/// Login / signup form shown until a session exists.
pub struct AuthForm {
    mode: AuthMode,
    username: Input,
    password: Input,
    on_password: bool,
    error: Option<String>,
    notice: Option<String>,
    processing: bool,
}

impl AuthForm {
    pub fn new(prefill_username: Option<&str>) -> Self {
        let username = Input::default().with_value(prefill_username.unwrap_or_default().to_string());
        let on_password = !username.value().is_empty();
        AuthForm {
            mode: AuthMode::Login,
            username,
            password: Input::default(),
            on_password,
            error: None,
            notice: None,
            processing: false,
        }
    }

    pub fn set_processing(&mut self, processing: bool) {
        self.processing = processing;
        if processing {
            self.error = None;
            self.notice = None;
        }
    }

    pub fn set_error(&mut self, error: String) {
        self.error = Some(error);
        self.notice = None;
    }

    /// Account created: back to the login form with a hint.
    pub fn signup_done(&mut self) {
        self.mode = AuthMode::Login;
        self.password = Input::default();
        self.on_password = true;
        self.error = None;
        self.notice = Some("Account created! Please log in.".to_string());
    }

    pub fn handle_input(&mut self) -> Result<Option<AuthAction>> {
        let key = match poll_key()? {
            Some(key) => key,
            None => return Ok(None),
        };
        if self.processing {
            return Ok(None);
        }
        match key.code {
            KeyCode::Esc => return Ok(Some(AuthAction::Quit)),
            KeyCode::Tab | KeyCode::Down | KeyCode::Up => self.on_password = !self.on_password,
            KeyCode::Enter => {
                return Ok(Some(AuthAction::Submit {
                    mode: self.mode,
                    username: self.username.value().trim().to_string(),
                    password: self.password.value().to_string(),
                }));
            }
            _ if ctrl(&key, 't') => {
                self.mode = match self.mode {
                    AuthMode::Login => AuthMode::Signup,
                    AuthMode::Signup => AuthMode::Login,
                };
                self.error = None;
                self.notice = None;
            }
            _ => {
                let field = if self.on_password {
                    &mut self.password
                } else {
                    &mut self.username
                };
                field.handle_event(&Event::Key(key));
            }
        }
        Ok(None)
    }

    pub fn draw<B: Backend>(&self, frame: &mut Frame<B>) {
        let size = frame.size();
        let width = 50.min(size.width.saturating_sub(4));
        let height = 14.min(size.height.saturating_sub(2));
        let area = Rect::new(
            (size.width.saturating_sub(width)) / 2,
            (size.height.saturating_sub(height)) / 2,
            width,
            height,
        );

        let title = match self.mode {
            AuthMode::Login => "Login",
            AuthMode::Signup => "Sign Up",
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        frame.render_widget(block, area);

        let inner = area.inner(&Margin {
            vertical: 1,
            horizontal: 2,
        });
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Username
                Constraint::Length(3), // Password
                Constraint::Length(2), // Status
                Constraint::Min(1),    // Hints
            ])
            .split(inner);

        let focused = Style::default().fg(Color::Yellow);
        let username = Paragraph::new(self.username.value()).block(
            Block::default()
                .title("Username")
                .borders(Borders::ALL)
                .border_style(if self.on_password { Style::default() } else { focused }),
        );
        frame.render_widget(username, chunks[0]);

        let masked = "*".repeat(self.password.value().chars().count());
        let password = Paragraph::new(masked).block(
            Block::default()
                .title("Password")
                .borders(Borders::ALL)
                .border_style(if self.on_password { focused } else { Style::default() }),
        );
        frame.render_widget(password, chunks[1]);

        let status = if self.processing {
            Line::from(Span::styled("Processing...", Style::default().fg(Color::Gray)))
        } else if let Some(error) = &self.error {
            Line::from(Span::styled(error.as_str(), Style::default().fg(Color::Red)))
        } else if let Some(notice) = &self.notice {
            Line::from(Span::styled(notice.as_str(), Style::default().fg(Color::Green)))
        } else {
            Line::from("")
        };
        frame.render_widget(Paragraph::new(status).wrap(Wrap { trim: true }), chunks[2]);

        let toggle = match self.mode {
            AuthMode::Login => "Ctrl+T: don't have an account? Sign up",
            AuthMode::Signup => "Ctrl+T: already have an account? Log in",
        };
        let hints = Paragraph::new(vec![
            Line::from("Enter submit | Tab switch field | Esc quit"),
            Line::from(toggle),
        ])
        .style(Style::default().fg(Color::Gray));
        frame.render_widget(hints, chunks[3]);

        let (field, input) = if self.on_password {
            (chunks[1], self.password.cursor())
        } else {
            (chunks[0], self.username.cursor())
        };
        frame.set_cursor(field.x + input as u16 + 1, field.y + 1);
    }
}

/// Which part of the chat screen receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Search,
    Requests,
    Contacts,
    Message,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Search => Focus::Requests,
            Focus::Requests => Focus::Contacts,
            Focus::Contacts => Focus::Message,
            Focus::Message => Focus::Search,
        }
    }
}

/// What the main loop should do with a key press on the chat screen.
#[derive(Debug)]
pub enum UiAction {
    Quit,
    Logout,
    SearchChanged(String),
    SendFriendRequest(String),
    AcceptRequest(FriendRequest),
    RejectRequest(FriendRequest),
    SelectContact(Contact),
    SelectNext(PanelList),
    SelectPrev(PanelList),
    Send(String),
    StageImage(PathBuf),
    UnstageImage,
    RequestRemoval,
    ConfirmRemoval(bool),
    DismissToast,
}

pub struct ChatUI {
    focus: Focus,
    search: Input,
    message: Input,
    image_dialog: Option<Input>,
    help_dialog: bool,
}

impl ChatUI {
    pub fn new() -> Self {
        ChatUI {
            focus: Focus::Contacts,
            search: Input::default(),
            message: Input::default(),
            image_dialog: None,
            help_dialog: false,
        }
    }

    pub fn clear_message_input(&mut self) {
        self.message = Input::default();
    }

    /// Keep the search box in step with the panel after it was cleared.
    pub fn sync_search(&mut self, query: &str) {
        if self.search.value() != query {
            self.search = Input::default().with_value(query.to_string());
        }
    }

    pub fn handle_input(&mut self, room: &ChatRoom) -> Result<Option<UiAction>> {
        let key = match poll_key()? {
            Some(key) => key,
            None => return Ok(None),
        };

        // Removal confirmation takes every key until answered
        if room.pending_removal().is_some() {
            return Ok(match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UiAction::ConfirmRemoval(true)),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(UiAction::ConfirmRemoval(false)),
                _ => None,
            });
        }

        if let Some(input) = &mut self.image_dialog {
            match key.code {
                KeyCode::Esc => self.image_dialog = None,
                KeyCode::Enter => {
                    let path = input.value().trim().to_string();
                    self.image_dialog = None;
                    if !path.is_empty() {
                        return Ok(Some(UiAction::StageImage(PathBuf::from(path))));
                    }
                }
                _ => {
                    input.handle_event(&Event::Key(key));
                }
            }
            return Ok(None);
        }

        if self.help_dialog {
            self.help_dialog = false;
            return Ok(None);
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            let action = match key.code {
                KeyCode::Char('l') => Some(UiAction::Logout),
                KeyCode::Char('d') => Some(UiAction::RequestRemoval),
                KeyCode::Char('x') => Some(UiAction::UnstageImage),
                KeyCode::Char('k') => Some(UiAction::DismissToast),
                KeyCode::Char('p') => {
                    if room.conversation().contact().is_some() {
                        self.image_dialog = Some(Input::default());
                    }
                    None
                }
                KeyCode::Char('h') => {
                    self.help_dialog = true;
                    None
                }
                _ => None,
            };
            return Ok(action);
        }

        match key.code {
            KeyCode::Esc => return Ok(Some(UiAction::Quit)),
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return Ok(None);
            }
            _ => {}
        }

        let action = match self.focus {
            Focus::Search => match key.code {
                KeyCode::Down => Some(UiAction::SelectNext(PanelList::Results)),
                KeyCode::Up => Some(UiAction::SelectPrev(PanelList::Results)),
                KeyCode::Enter => room
                    .panel()
                    .highlighted_result()
                    .map(|user| UiAction::SendFriendRequest(user.username.clone())),
                _ => {
                    let before = self.search.value().to_string();
                    self.search.handle_event(&Event::Key(key));
                    if self.search.value() != before {
                        Some(UiAction::SearchChanged(self.search.value().to_string()))
                    } else {
                        None
                    }
                }
            },
            Focus::Requests => {
                let highlighted = room.panel().highlighted_request().cloned();
                match key.code {
                    KeyCode::Down => Some(UiAction::SelectNext(PanelList::Requests)),
                    KeyCode::Up => Some(UiAction::SelectPrev(PanelList::Requests)),
                    KeyCode::Enter | KeyCode::Char('a') => highlighted.map(UiAction::AcceptRequest),
                    KeyCode::Char('r') => highlighted.map(UiAction::RejectRequest),
                    _ => None,
                }
            }
            Focus::Contacts => match key.code {
                KeyCode::Down => Some(UiAction::SelectNext(PanelList::Contacts)),
                KeyCode::Up => Some(UiAction::SelectPrev(PanelList::Contacts)),
                KeyCode::Enter => {
                    let contact = room.panel().highlighted_contact().cloned();
                    if contact.is_some() {
                        self.focus = Focus::Message;
                    }
                    contact.map(UiAction::SelectContact)
                }
                _ => None,
            },
            Focus::Message => match key.code {
                KeyCode::Enter => Some(UiAction::Send(self.message.value().to_string())),
                KeyCode::Char(_) if self.message.value().chars().count() >= MAX_MESSAGE_LEN => None,
                _ => {
                    self.message.handle_event(&Event::Key(key));
                    None
                }
            },
        };
        if let Some(action) = &action {
            debug!("UI action: {:?}", action);
        }
        Ok(action)
    }

    pub fn draw<B: Backend>(&self, frame: &mut Frame<B>, room: &ChatRoom) {
        let size = frame.size();

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30), // Sidebar
                Constraint::Percentage(70), // Chat
            ])
            .split(size);

        self.draw_sidebar(frame, room, chunks[0]);
        self.draw_chat(frame, room, chunks[1]);

        if let Some(contact) = room.pending_removal() {
            draw_remove_dialog(frame, contact, size);
        }
        if let Some(input) = &self.image_dialog {
            draw_image_dialog(frame, input, size);
        }
        if self.help_dialog {
            draw_help_dialog(frame, size);
        }
        if let Some(toast) = room.notifier().current() {
            draw_toast(frame, toast, size);
        }
    }

    fn border(&self, focus: Focus) -> Style {
        if self.focus == focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    }

    fn draw_sidebar<B: Backend>(&self, f: &mut Frame<B>, room: &ChatRoom, area: Rect) {
        let panel = room.panel();
        let dropdown_height = if panel.show_dropdown() {
            (panel.results().len() as u16).min(5) + 2
        } else {
            0
        };
        let requests_height = if panel.requests().is_empty() {
            0
        } else {
            (panel.requests().len() as u16).min(5) + 2
        };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),                // User header
                Constraint::Length(3),                // Search box
                Constraint::Length(dropdown_height),  // Search results
                Constraint::Length(requests_height),  // Friend requests
                Constraint::Min(3),                   // Contacts
            ])
            .split(area);

        let (status, status_color) = if room.is_connected() {
            ("connected", Color::Green)
        } else {
            ("disconnected", Color::Red)
        };
        let header = Paragraph::new(Line::from(vec![
            Span::styled(room.identity().username.as_str(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" "),
            Span::styled(format!("({})", status), Style::default().fg(status_color)),
        ]))
        .block(Block::default().borders(Borders::ALL).title("Chatroom"));
        f.render_widget(header, chunks[0]);

        let search_title = if room.is_searching() {
            "Searching..."
        } else {
            "Search users..."
        };
        let search = Paragraph::new(self.search.value()).block(
            Block::default()
                .title(search_title)
                .borders(Borders::ALL)
                .border_style(self.border(Focus::Search)),
        );
        f.render_widget(search, chunks[1]);
        if self.focus == Focus::Search {
            f.set_cursor(chunks[1].x + self.search.cursor() as u16 + 1, chunks[1].y + 1);
        }

        if panel.show_dropdown() {
            let items: Vec<ListItem> = panel
                .results()
                .iter()
                .map(|user| ListItem::new(format!("{}  [Enter: Add]", user.username)))
                .collect();
            render_cursor_list(f, items, panel.cursor(PanelList::Results), "Results", chunks[2], self.focus == Focus::Search);
        }

        if !panel.requests().is_empty() {
            let items: Vec<ListItem> = panel
                .requests()
                .iter()
                .map(|request| ListItem::new(format!("{}  [a]ccept [r]eject", request.sender_username)))
                .collect();
            let title = format!("Friend Requests ({})", panel.requests().len());
            render_cursor_list(f, items, panel.cursor(PanelList::Requests), &title, chunks[3], self.focus == Focus::Requests);
        }

        let selected_id = room.conversation().contact().map(|c| c.id.as_str());
        let contacts_block = Block::default()
            .title("Contacts")
            .borders(Borders::ALL)
            .border_style(self.border(Focus::Contacts));
        if panel.contacts().is_empty() {
            let empty = Paragraph::new("No contacts yet. Search for users to add!")
                .style(Style::default().fg(Color::Gray))
                .wrap(Wrap { trim: true })
                .block(contacts_block);
            f.render_widget(empty, chunks[4]);
            return;
        }
        let items: Vec<ListItem> = panel
            .contacts()
            .iter()
            .map(|contact| {
                let (dot, color) = if contact.online {
                    ("● ", Color::Green)
                } else {
                    ("○ ", Color::Gray)
                };
                let mut name = Style::default();
                if Some(contact.id.as_str()) == selected_id {
                    name = name.add_modifier(Modifier::BOLD);
                }
                ListItem::new(Line::from(vec![
                    Span::styled(dot, Style::default().fg(color)),
                    Span::styled(contact.username.as_str(), name),
                ]))
            })
            .collect();
        let mut state = ListState::default();
        if self.focus == Focus::Contacts {
            state.select(Some(panel.cursor(PanelList::Contacts)));
        }
        let list = List::new(items)
            .block(contacts_block)
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("> ");
        f.render_stateful_widget(list, chunks[4], &mut state);
    }

    fn draw_chat<B: Backend>(&self, f: &mut Frame<B>, room: &ChatRoom, area: Rect) {
        let conversation = room.conversation();
        let staged = conversation.staged_image();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),                                    // Contact header
                Constraint::Min(3),                                       // Messages
                Constraint::Length(if staged.is_some() { 1 } else { 0 }), // Staged image
                Constraint::Length(3),                                    // Input box
                Constraint::Length(1),                                    // Help line
            ])
            .split(area);

        let contact = match conversation.contact() {
            Some(contact) => contact,
            None => {
                let empty = Paragraph::new("Select a contact to start chatting")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::Gray))
                    .block(Block::default().borders(Borders::ALL));
                let body = Rect::new(area.x, area.y, area.width, area.height.saturating_sub(1));
                f.render_widget(empty, body);
                draw_help_line(f, chunks[4]);
                return;
            }
        };

        let (presence, color) = if contact.online {
            ("Online", Color::Green)
        } else {
            ("Offline", Color::Gray)
        };
        let header = Paragraph::new(Line::from(vec![
            Span::styled(contact.username.as_str(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(presence, Style::default().fg(color)),
            Span::styled("   Ctrl+D remove contact", Style::default().fg(Color::Gray)),
        ]))
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(header, chunks[0]);

        match conversation.state() {
            ConversationState::Loading { .. } => {
                let loading = Paragraph::new("Loading conversation...")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::Gray))
                    .block(Block::default().borders(Borders::ALL).title("Messages"));
                f.render_widget(loading, chunks[1]);
            }
            _ => draw_messages(f, conversation.messages(), &contact.username, chunks[1]),
        }

        if let Some(image) = staged {
            let line = Paragraph::new(format!(
                "Image: {} ({} KB)  [Enter send | Ctrl+X remove]",
                image.file_name,
                (image.size + 1023) / 1024
            ))
            .style(Style::default().fg(Color::Cyan));
            f.render_widget(line, chunks[2]);
        }

        let count = self.message.value().chars().count();
        let input = Paragraph::new(self.message.value()).block(
            Block::default()
                .title(format!("Type a message... ({}/{})", count, MAX_MESSAGE_LEN))
                .borders(Borders::ALL)
                .border_style(self.border(Focus::Message)),
        );
        f.render_widget(input, chunks[3]);
        if self.focus == Focus::Message && self.image_dialog.is_none() {
            f.set_cursor(chunks[3].x + self.message.cursor() as u16 + 1, chunks[3].y + 1);
        }

        draw_help_line(f, chunks[4]);
    }
}

fn render_cursor_list<B: Backend>(f: &mut Frame<B>, items: Vec<ListItem>, cursor: usize, title: &str, area: Rect, focused: bool) {
    let mut state = ListState::default();
    if focused {
        state.select(Some(cursor));
    }
    let list = List::new(items)
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_style(if focused { Style::default().fg(Color::Yellow) } else { Style::default() }),
        )
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_help_line<B: Backend>(f: &mut Frame<B>, area: Rect) {
    let help = Paragraph::new(Line::from(Span::styled(
        "ESC quit | TAB focus | Ctrl+P image | Ctrl+L logout | Ctrl+H help",
        Style::default().fg(Color::Gray),
    )));
    f.render_widget(help, area);
}

fn draw_messages<B: Backend>(f: &mut Frame<B>, messages: &[Message], peer: &str, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Messages");
    if messages.is_empty() {
        let empty = Paragraph::new("No messages yet. Start the conversation!")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let wrap_width = area.width.saturating_sub(2).max(1) as usize;
    let items: Vec<ListItem> = messages
        .iter()
        .flat_map(|m| {
            let who = if m.is_mine { "You" } else { peer };
            let body = match m.kind {
                MessageKind::Text => m.content.clone(),
                MessageKind::Image => format!("[image] {}", m.content),
            };
            let full = format!("[{}] {}: {}", format_clock(&m.timestamp), who, body);
            let style = if m.is_mine {
                Style::default().fg(Color::Blue)
            } else {
                Style::default()
            };
            wrap(&full, wrap_width)
                .into_iter()
                .map(|l| l.into_owned())
                .collect::<Vec<String>>()
                .into_iter()
                .map(move |line| ListItem::new(Text::from(line)).style(style))
        })
        .collect();

    // Keep the newest message in view
    let mut state = ListState::default();
    state.select(Some(items.len() - 1));
    let list = List::new(items).block(block).highlight_style(Style::default());
    f.render_stateful_widget(list, area, &mut state);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    Rect::new(
        (area.width.saturating_sub(width)) / 2,
        (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

fn draw_remove_dialog<B: Backend>(f: &mut Frame<B>, contact: &Contact, area: Rect) {
    let popup_area = centered(area, 60, 9);
    let popup_block = Block::default()
        .title("Remove Contact")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin {
        vertical: 1,
        horizontal: 2,
    });
    let content = vec![
        Line::from(format!("Remove {} from your contacts?", contact.username)),
        Line::from(""),
        Line::from(Span::styled(
            "This will permanently delete all chat history between you.",
            Style::default().fg(Color::Red),
        )),
        Line::from(""),
        Line::from("Press [Y] to confirm or [N]/[ESC] to cancel"),
    ];
    f.render_widget(Paragraph::new(content).wrap(Wrap { trim: true }), inner_area);
}

fn draw_image_dialog<B: Backend>(f: &mut Frame<B>, input: &Input, area: Rect) {
    let popup_area = centered(area, 60, 7);
    let popup_block = Block::default()
        .title("Send Image")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin {
        vertical: 1,
        horizontal: 2,
    });
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(3)])
        .split(inner_area);

    f.render_widget(Paragraph::new("Path to an image (max 5MB):"), chunks[0]);
    let field = Paragraph::new(input.value())
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Blue)));
    f.render_widget(field, chunks[1]);
    f.set_cursor(chunks[1].x + input.cursor() as u16 + 1, chunks[1].y + 1);
}

fn draw_help_dialog<B: Backend>(f: &mut Frame<B>, area: Rect) {
    let popup_area = centered(area, 60, 18);
    let popup_block = Block::default()
        .title("Help")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin {
        vertical: 1,
        horizontal: 2,
    });
    let lines = [
        "TAB        cycle search / requests / contacts / message",
        "Up/Down    move in the focused list",
        "Enter      add user / accept request / open chat / send",
        "a / r      accept / reject the highlighted request",
        "Ctrl+P     pick an image to send",
        "Ctrl+X     drop the picked image",
        "Ctrl+D     remove the open contact",
        "Ctrl+K     dismiss the notification",
        "Ctrl+L     log out",
        "ESC        quit",
        "",
        "Press any key to close",
    ];
    let items: Vec<ListItem> = lines.iter().map(|l| ListItem::new(*l)).collect();
    f.render_widget(List::new(items), inner_area);
}

fn draw_toast<B: Backend>(f: &mut Frame<B>, toast: &Toast, area: Rect) {
    let popup_width = 44.min(area.width.saturating_sub(4));
    let popup_height = 4.min(area.height.saturating_sub(2));
    let popup_area = Rect::new(area.width.saturating_sub(popup_width + 2), 1, popup_width, popup_height);

    let color = match toast.kind {
        ToastKind::Success => Color::Green,
        ToastKind::Error => Color::Red,
        ToastKind::Info => Color::Cyan,
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    f.render_widget(Clear, popup_area);
    let text = Paragraph::new(format!("{} {}", toast.kind.icon(), toast.message))
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true })
        .block(block);
    f.render_widget(text, popup_area);
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
