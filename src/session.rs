// Session store: who is logged in, and the login/signup/logout flows

use log::{error, info, warn};
use std::sync::Arc;

use crate::api::ChatApi;
use crate::error::{ClientError, ClientResult};
use crate::identity::IdentityCache;
use crate::models::{Identity, MIN_PASSWORD_LEN};

/// Local checks performed before any auth request goes out.
pub fn validate_credentials(username: &str, password: &str) -> ClientResult<()> {
    if username.is_empty() || password.is_empty() {
        return Err(ClientError::Validation("Please fill in all fields".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClientError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub struct SessionStore {
    api: Arc<dyn ChatApi>,
    cache: Arc<dyn IdentityCache>,
    identity: Option<Identity>,
}

impl SessionStore {
    pub fn new(api: Arc<dyn ChatApi>, cache: Arc<dyn IdentityCache>) -> Self {
        SessionStore {
            api,
            cache,
            identity: None,
        }
    }

    pub fn current(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Log in. On failure the error carries the server's message, and
    /// `ClientError::user_message("Invalid credentials")` is what to show.
    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<Identity> {
        validate_credentials(username, password)?;
        self.api.login(username, password).await.map_err(|e| {
            error!("Login error: {}", e);
            e
        })?;

        let identity = Identity {
            username: username.to_string(),
        };
        if let Err(e) = self.cache.store(&identity) {
            warn!("Could not cache identity: {}", e);
        }
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Create an account. The store stays logged out; the user logs in next.
    /// Show failures with `user_message("Username already taken")`.
    pub async fn signup(&mut self, username: &str, password: &str) -> ClientResult<()> {
        validate_credentials(username, password)?;
        self.api.signup(username, password).await.map_err(|e| {
            error!("Signup error: {}", e);
            e
        })
    }

    /// Invalidate the server session and forget the cached identity.
    /// Failures are only logged; the store always ends up logged out.
    pub async fn logout(&mut self) {
        if let Err(e) = self.api.logout().await {
            error!("Logout error: {}", e);
        }
        self.forget();
        info!("Logged out");
    }

    /// Guess whether an old session cookie is still good by probing a
    /// protected endpoint, then trust the cached username.
    ///
    /// This is a heuristic: the username is not re-fetched from the server.
    pub async fn check_auth_status(&mut self) -> Option<&Identity> {
        match self.api.probe_session().await {
            Ok(()) => match self.cache.load() {
                Ok(Some(identity)) => {
                    info!("Existing session found for {}", identity.username);
                    self.identity = Some(identity);
                }
                Ok(None) => {
                    info!("Session cookie valid but no cached username; treating as logged out");
                    self.identity = None;
                }
                Err(e) => {
                    warn!("Could not read identity cache: {}", e);
                    self.identity = None;
                }
            },
            Err(e) => {
                info!("No valid session: {}", e);
                self.identity = None;
            }
        }
        self.identity.as_ref()
    }

    fn forget(&mut self) {
        self.identity = None;
        if let Err(e) = self.cache.clear() {
            warn!("Could not clear identity cache: {}", e);
        }
    }
}
