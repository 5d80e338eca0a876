// Re-export modules for the binary and integration tests
pub mod api;
pub mod chat;
pub mod contacts;
pub mod conversation;
pub mod debounce;
pub mod error;
pub mod identity;
pub mod models;
pub mod notify;
pub mod realtime;
pub mod session;

// Re-export main types for convenience
pub use api::{ApiClient, ChatApi};
pub use chat::{ChatRoom, Completion};
pub use error::{ClientError, ClientResult};
pub use models::*;
pub use realtime::{RealtimeClient, RealtimeSender, ServerEvent};
pub use session::SessionStore;
