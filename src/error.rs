use thiserror::Error;

/// Errors that can occur while talking to the chat server
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected locally before any request was made
    #[error("{0}")]
    Validation(String),

    /// Server answered with a non-success status
    #[error("Server returned {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Server {
        status: u16,
        /// The `error` field of the response body, if there was one
        message: Option<String>,
    },

    /// Server answered 2xx but without the expected success marker
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP layer failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// WebSocket failure on the realtime channel
    #[error("Realtime channel error: {0}")]
    Realtime(String),

    /// Realtime channel is not open
    #[error("Not connected to the realtime channel")]
    NotConnected,

    /// Malformed JSON or packet
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Local file or cache I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    /// Text to show the user: validation messages and server-supplied errors
    /// pass through, everything else becomes `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Server { message: Some(msg), .. } if !msg.is_empty() => msg.clone(),
            _ => fallback.to_string(),
        }
    }

    /// True when the server rejected the request because the session is gone.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Server { status: 401, .. })
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Realtime(e.to_string())
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
