// Authentication endpoints: login, signup, logout

use log::{debug, info};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};

#[derive(Serialize)]
struct CredentialsBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

impl ApiClient {
    /// `POST /api/login`. Succeeds only on 200 with a `message` in the body;
    /// the session cookie lands in the jar.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<()> {
        let resp = self
            .post_json("/api/login", &CredentialsBody { username, password })
            .await?;
        expect_message(resp, StatusCode::OK).await?;
        self.save_cookies();
        info!("Logged in as {}", username);
        Ok(())
    }

    /// `POST /api/signup`. Succeeds only on 201 with a `message`.
    pub async fn signup(&self, username: &str, password: &str) -> ClientResult<()> {
        let resp = self
            .post_json("/api/signup", &CredentialsBody { username, password })
            .await?;
        expect_message(resp, StatusCode::CREATED).await?;
        info!("Created account {}", username);
        Ok(())
    }

    /// `GET /logout`. The saved cookie is dropped even if the request fails.
    pub async fn logout(&self) -> ClientResult<()> {
        self.forget_cookies();
        self.get("/logout").await?;
        debug!("Server session invalidated");
        Ok(())
    }
}

async fn expect_message(resp: reqwest::Response, expected: StatusCode) -> ClientResult<()> {
    let status = resp.status();
    if status != expected {
        return Err(ClientError::UnexpectedResponse(format!(
            "expected {} but got {}",
            expected, status
        )));
    }
    let body: MessageBody = resp.json().await?;
    match body.message {
        Some(_) => Ok(()),
        None => Err(ClientError::UnexpectedResponse("missing message".to_string())),
    }
}
