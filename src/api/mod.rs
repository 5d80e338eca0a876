// REST API client for the chat server
// The session is a server-managed cookie kept in a shared jar, so the realtime
// channel can reuse it on its upgrade request. With a cookie file the jar is
// saved after login and restored on the next start.

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::models::{Contact, FriendRequest, UserSummary};

pub mod auth;
pub mod contacts;
pub mod messages;

pub use messages::image_mime;

/// Session cookie file, kept beside the identity cache.
pub const COOKIE_FILE: &str = "session_cookie";

/// Everything the UI needs from the REST side of the server.
///
/// `ApiClient` is the real implementation; tests substitute in-memory fakes.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> ClientResult<()>;
    async fn signup(&self, username: &str, password: &str) -> ClientResult<()>;
    async fn logout(&self) -> ClientResult<()>;
    /// Hit a protected endpoint to find out whether the session cookie is still valid.
    async fn probe_session(&self) -> ClientResult<()>;
    async fn contacts(&self) -> ClientResult<Vec<Contact>>;
    async fn search_users(&self, query: &str) -> ClientResult<Vec<UserSummary>>;
    async fn send_friend_request(&self, username: &str) -> ClientResult<()>;
    async fn pending_requests(&self) -> ClientResult<Vec<FriendRequest>>;
    async fn accept_request(&self, request_id: &str) -> ClientResult<()>;
    async fn reject_request(&self, request_id: &str) -> ClientResult<()>;
    async fn remove_contact(&self, contact_id: &str) -> ClientResult<()>;
    async fn upload_image(&self, recipient_id: &str, file_name: &str, bytes: Vec<u8>) -> ClientResult<()>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    http: Client,
    jar: Arc<Jar>,
    cookie_file: Option<PathBuf>,
}

impl ApiClient {
    /// Client with an in-memory cookie jar only.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::build(base_url, None)
    }

    /// Client whose session cookie survives restarts in `dir`.
    pub fn with_cookie_dir(base_url: &str, dir: &Path) -> ClientResult<Self> {
        Self::build(base_url, Some(dir.join(COOKIE_FILE)))
    }

    fn build(base_url: &str, cookie_file: Option<PathBuf>) -> ClientResult<Self> {
        let base = Url::parse(base_url)?;
        let jar = Arc::new(Jar::default());
        if let Some(path) = &cookie_file {
            restore_cookies(&jar, &base, path);
        }
        let http = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            base,
            http,
            jar,
            cookie_file,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `Cookie` header value for the server origin, if a session cookie was set.
    pub fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.base)
            .and_then(|value| value.to_str().ok().map(|s| s.to_string()))
    }

    /// Write the current session cookie to the cookie file, if there is one.
    pub(crate) fn save_cookies(&self) {
        let path = match &self.cookie_file {
            Some(path) => path,
            None => return,
        };
        match self.cookie_header() {
            Some(header) => match fs::write(path, header) {
                Ok(()) => debug!("Saved session cookie to {}", path.display()),
                Err(e) => warn!("Could not save session cookie: {}", e),
            },
            None => self.forget_cookies(),
        }
    }

    /// Delete the cookie file. The in-memory jar is left to the server's expiry.
    pub(crate) fn forget_cookies(&self) {
        if let Some(path) = &self.cookie_file {
            match fs::remove_file(path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove session cookie: {}", e),
            }
        }
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base.join(path)?)
    }

    /// Turn a non-2xx response into `ClientError::Server`, keeping the body's
    /// `error` field when it has one.
    async fn check(resp: Response) -> ClientResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.json::<ErrorBody>().await.ok().and_then(|body| body.error);
        debug!("Request failed with {}: {:?}", status, message);
        Err(ClientError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn post_json<T: serde::Serialize + ?Sized>(&self, path: &str, body: &T) -> ClientResult<Response> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);
        let resp = self.http.post(url).json(body).send().await?;
        Self::check(resp).await
    }

    async fn get(&self, path: &str) -> ClientResult<Response> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        Self::check(resp).await
    }
}

/// Load `name=value` pairs saved by `save_cookies` back into the jar.
fn restore_cookies(jar: &Jar, base: &Url, path: &Path) {
    let saved = match fs::read_to_string(path) {
        Ok(saved) => saved,
        Err(e) if e.kind() == ErrorKind::NotFound => return,
        Err(e) => {
            warn!("Could not read session cookie: {}", e);
            return;
        }
    };
    let mut restored = 0;
    for pair in saved.split(';').map(str::trim).filter(|p| p.contains('=')) {
        jar.add_cookie_str(&format!("{}; Path=/", pair), base);
        restored += 1;
    }
    info!("Restored {} cookie(s) from {}", restored, path.display());
}

#[async_trait]
impl ChatApi for ApiClient {
    async fn login(&self, username: &str, password: &str) -> ClientResult<()> {
        ApiClient::login(self, username, password).await
    }

    async fn signup(&self, username: &str, password: &str) -> ClientResult<()> {
        ApiClient::signup(self, username, password).await
    }

    async fn logout(&self) -> ClientResult<()> {
        ApiClient::logout(self).await
    }

    async fn probe_session(&self) -> ClientResult<()> {
        self.get_contacts().await.map(|_| ())
    }

    async fn contacts(&self) -> ClientResult<Vec<Contact>> {
        self.get_contacts().await
    }

    async fn search_users(&self, query: &str) -> ClientResult<Vec<UserSummary>> {
        ApiClient::search_users(self, query).await
    }

    async fn send_friend_request(&self, username: &str) -> ClientResult<()> {
        ApiClient::send_friend_request(self, username).await
    }

    async fn pending_requests(&self) -> ClientResult<Vec<FriendRequest>> {
        self.get_pending_requests().await
    }

    async fn accept_request(&self, request_id: &str) -> ClientResult<()> {
        self.answer_request("accept", request_id).await
    }

    async fn reject_request(&self, request_id: &str) -> ClientResult<()> {
        self.answer_request("reject", request_id).await
    }

    async fn remove_contact(&self, contact_id: &str) -> ClientResult<()> {
        ApiClient::remove_contact(self, contact_id).await
    }

    async fn upload_image(&self, recipient_id: &str, file_name: &str, bytes: Vec<u8>) -> ClientResult<()> {
        ApiClient::upload_image(self, recipient_id, file_name, bytes).await
    }
}
