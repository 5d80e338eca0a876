// Common test utilities for integration tests
// Shared logging setup, an in-process mock of the chat server's REST API,
// and in-memory fakes for the ChatApi / RealtimeSender seams.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{debug, LevelFilter};
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use tokio::task::JoinHandle;

use chatroom::{
    api::ChatApi,
    error::{ClientError, ClientResult},
    models::{Contact, FriendRequest, UserSummary},
    realtime::{OutboundEvent, RealtimeSender},
};

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

pub fn contact(id: &str, username: &str, online: bool) -> Contact {
    Contact {
        id: id.to_string(),
        username: username.to_string(),
        online,
    }
}

pub fn request(id: &str, sender: &str) -> FriendRequest {
    FriendRequest {
        id: id.to_string(),
        sender_username: sender.to_string(),
        sender_id: None,
        sent_at: None,
    }
}

// ---------------------------------------------------------------------------
// Mock REST server
// ---------------------------------------------------------------------------

const SESSION_COOKIE: &str = "session";

/// What the mock server has seen, for assertions.
#[derive(Default)]
pub struct MockState {
    users: Mutex<HashMap<String, String>>,
    sessions: Mutex<HashSet<String>>,
    pub searches: Mutex<Vec<String>>,
    pub friend_requests: Mutex<Vec<String>>,
    pub answered: Mutex<Vec<(String, String)>>,
    pub removed: Mutex<Vec<String>>,
    /// (recipient_id, file name, content type, size)
    pub uploads: Mutex<Vec<(String, String, String, usize)>>,
}

impl MockState {
    fn session_user(&self, headers: &HeaderMap) -> Option<String> {
        let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
        let token = cookies
            .split(';')
            .map(str::trim)
            .find_map(|c| c.strip_prefix("session="))?;
        let sessions = self.sessions.lock().unwrap();
        if sessions.contains(token) {
            token.strip_prefix("token-").map(|u| u.to_string())
        } else {
            None
        }
    }
}

pub struct MockServer {
    pub base_url: String,
    pub state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Start the mock on an ephemeral port with one registered user.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        state
            .users
            .lock()
            .unwrap()
            .insert("alice".to_string(), "wonderland".to_string());

        let app = Router::new()
            .route("/api/signup", post(signup))
            .route("/api/login", post(login))
            .route("/logout", get(logout))
            .route("/api/contacts", get(contacts))
            .route("/api/users/search", get(search))
            .route("/api/friend-requests/send", post(send_request))
            .route("/api/friend-requests/pending", get(pending))
            .route("/api/friend-requests/:decision", post(answer))
            .route("/api/contacts/remove", post(remove))
            .route("/api/messages/image", post(upload))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        debug!("Mock chat server on {}", addr);

        MockServer {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn unauthorized() -> Response {
    error(StatusCode::UNAUTHORIZED, "Unauthorized")
}

async fn signup(State(state): State<Arc<MockState>>, Json(body): Json<Credentials>) -> Response {
    let mut users = state.users.lock().unwrap();
    if users.contains_key(&body.username) {
        return error(StatusCode::BAD_REQUEST, "Username already exists");
    }
    users.insert(body.username, body.password);
    (StatusCode::CREATED, Json(json!({ "message": "User created successfully" }))).into_response()
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Credentials>) -> Response {
    let valid = state.users.lock().unwrap().get(&body.username) == Some(&body.password);
    if !valid {
        return error(StatusCode::UNAUTHORIZED, "Invalid username or password");
    }
    let token = format!("token-{}", body.username);
    state.sessions.lock().unwrap().insert(token.clone());
    (
        StatusCode::OK,
        [(header::SET_COOKIE, format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, token))],
        Json(json!({ "message": "Login successful" })),
    )
        .into_response()
}

async fn logout(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Some(user) = state.session_user(&headers) {
        state.sessions.lock().unwrap().remove(&format!("token-{}", user));
    }
    (StatusCode::OK, Json(json!({ "message": "Logged out" }))).into_response()
}

async fn contacts(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if state.session_user(&headers).is_none() {
        return unauthorized();
    }
    Json(json!({
        "contacts": [
            { "id": "2", "username": "bob", "online": true },
            { "id": "3", "username": "carol" }
        ]
    }))
    .into_response()
}

async fn search(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if state.session_user(&headers).is_none() {
        return unauthorized();
    }
    let q = params.get("q").cloned().unwrap_or_default();
    state.searches.lock().unwrap().push(q.clone());
    let users: Vec<_> = ["bob", "bobby", "dave & co"]
        .iter()
        .enumerate()
        .filter(|(_, name)| name.contains(q.as_str()))
        .map(|(i, name)| json!({ "id": format!("u{}", i), "username": name }))
        .collect();
    Json(json!({ "users": users })).into_response()
}

#[derive(Deserialize)]
struct UsernameBody {
    username: String,
}

async fn send_request(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<UsernameBody>,
) -> Response {
    if state.session_user(&headers).is_none() {
        return unauthorized();
    }
    if body.username == "ghost" {
        return error(StatusCode::NOT_FOUND, "User not found");
    }
    state.friend_requests.lock().unwrap().push(body.username);
    Json(json!({ "message": "Friend request sent" })).into_response()
}

async fn pending(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if state.session_user(&headers).is_none() {
        return unauthorized();
    }
    Json(json!({
        "requests": [
            { "id": "r1", "sender_id": "4", "sender_username": "erin", "sent_at": "2024-05-01T10:00:00" }
        ]
    }))
    .into_response()
}

#[derive(Deserialize)]
struct RequestIdBody {
    request_id: String,
}

async fn answer(
    State(state): State<Arc<MockState>>,
    Path(decision): Path<String>,
    headers: HeaderMap,
    Json(body): Json<RequestIdBody>,
) -> Response {
    if state.session_user(&headers).is_none() {
        return unauthorized();
    }
    if decision != "accept" && decision != "reject" {
        return error(StatusCode::NOT_FOUND, "Unknown action");
    }
    state.answered.lock().unwrap().push((decision, body.request_id));
    Json(json!({ "message": "ok" })).into_response()
}

#[derive(Deserialize)]
struct ContactIdBody {
    contact_id: String,
}

async fn remove(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<ContactIdBody>,
) -> Response {
    if state.session_user(&headers).is_none() {
        return unauthorized();
    }
    state.removed.lock().unwrap().push(body.contact_id);
    Json(json!({ "message": "Contact removed" })).into_response()
}

async fn upload(State(state): State<Arc<MockState>>, headers: HeaderMap, mut form: Multipart) -> Response {
    if state.session_user(&headers).is_none() {
        return unauthorized();
    }
    let mut recipient = None;
    let mut image = None;
    while let Ok(Some(field)) = form.next_field().await {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("recipient_id") => recipient = field.text().await.ok(),
            Some("image") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let mime = field.content_type().unwrap_or_default().to_string();
                let size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
                image = Some((name, mime, size));
            }
            _ => {}
        }
    }
    match (recipient, image) {
        (Some(recipient), Some((name, mime, size))) => {
            state.uploads.lock().unwrap().push((recipient, name, mime, size));
            Json(json!({ "success": true })).into_response()
        }
        _ => error(StatusCode::BAD_REQUEST, "Missing image or recipient"),
    }
}

// ---------------------------------------------------------------------------
// In-memory fakes
// ---------------------------------------------------------------------------

/// ChatApi fake that records every call and answers from canned data.
#[derive(Default)]
pub struct FakeApi {
    calls: Mutex<Vec<String>>,
    pub contacts: Mutex<Vec<Contact>>,
    pub requests: Mutex<Vec<FriendRequest>>,
    pub users: Mutex<Vec<UserSummary>>,
    failures: Mutex<HashMap<&'static str, (u16, Option<String>)>>,
    pub session_valid: AtomicBool,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `op` fail with a 400, with `message` as the server's error text.
    pub fn fail_on(&self, op: &'static str, message: Option<&str>) {
        self.fail_with(op, 400, message);
    }

    pub fn fail_with(&self, op: &'static str, status: u16, message: Option<&str>) {
        self.failures
            .lock()
            .unwrap()
            .insert(op, (status, message.map(|m| m.to_string())));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(':').next() == Some(op))
            .count()
    }

    fn record(&self, op: &'static str, arg: &str) -> ClientResult<()> {
        self.calls.lock().unwrap().push(format!("{}:{}", op, arg));
        match self.failures.lock().unwrap().get(op) {
            Some((status, message)) => Err(ClientError::Server {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn login(&self, username: &str, _password: &str) -> ClientResult<()> {
        self.record("login", username)
    }

    async fn signup(&self, username: &str, _password: &str) -> ClientResult<()> {
        self.record("signup", username)
    }

    async fn logout(&self) -> ClientResult<()> {
        self.record("logout", "")
    }

    async fn probe_session(&self) -> ClientResult<()> {
        self.record("probe_session", "")?;
        if self.session_valid.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::Server {
                status: 401,
                message: Some("Unauthorized".to_string()),
            })
        }
    }

    async fn contacts(&self) -> ClientResult<Vec<Contact>> {
        self.record("contacts", "")?;
        Ok(self.contacts.lock().unwrap().clone())
    }

    async fn search_users(&self, query: &str) -> ClientResult<Vec<UserSummary>> {
        self.record("search_users", query)?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.username.contains(query))
            .cloned()
            .collect())
    }

    async fn send_friend_request(&self, username: &str) -> ClientResult<()> {
        self.record("send_friend_request", username)
    }

    async fn pending_requests(&self) -> ClientResult<Vec<FriendRequest>> {
        self.record("pending_requests", "")?;
        Ok(self.requests.lock().unwrap().clone())
    }

    async fn accept_request(&self, request_id: &str) -> ClientResult<()> {
        self.record("accept_request", request_id)
    }

    async fn reject_request(&self, request_id: &str) -> ClientResult<()> {
        self.record("reject_request", request_id)
    }

    async fn remove_contact(&self, contact_id: &str) -> ClientResult<()> {
        self.record("remove_contact", contact_id)
    }

    async fn upload_image(&self, recipient_id: &str, file_name: &str, _bytes: Vec<u8>) -> ClientResult<()> {
        self.record("upload_image", &format!("{}/{}", recipient_id, file_name))
    }
}

/// RealtimeSender fake that records emitted events.
pub struct FakeChannel {
    pub emitted: Mutex<Vec<OutboundEvent>>,
    pub connected: AtomicBool,
}

impl FakeChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeChannel {
            emitted: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        })
    }

    pub fn emitted(&self) -> Vec<OutboundEvent> {
        self.emitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RealtimeSender for FakeChannel {
    async fn emit(&self, event: OutboundEvent) -> ClientResult<()> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.emitted.lock().unwrap().push(event);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
