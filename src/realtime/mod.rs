// Realtime channel for the chat client
// One Socket.IO connection per authenticated session. Inbound events are
// delivered on an mpsc receiver; outbound events go through `RealtimeSender`.

use async_trait::async_trait;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{ClientError, ClientResult};

pub mod connection;
pub mod events;
pub mod packet;

pub use events::{OutboundEvent, PresenceChange, ServerEvent};

/// The outbound half of the realtime channel as seen by the UI logic.
#[async_trait]
pub trait RealtimeSender: Send + Sync {
    async fn emit(&self, event: OutboundEvent) -> ClientResult<()>;
    fn is_connected(&self) -> bool;
}

pub struct RealtimeClient {
    sid: String,
    frame_tx: mpsc::Sender<String>,
    connected: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RealtimeClient {
    /// Engine.IO session id assigned by the server.
    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// Shared flag that the reader task clears when the socket goes away.
    pub fn connection_flag(&self) -> Arc<AtomicBool> {
        self.connected.clone()
    }
}

#[async_trait]
impl RealtimeSender for RealtimeClient {
    async fn emit(&self, event: OutboundEvent) -> ClientResult<()> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let frame = packet::encode(&packet::EnginePacket::Message(packet::SocketPacket::event(
            event.name(),
            event.payload(),
        )));
        debug!("Emitting {}", event.name());
        self.frame_tx
            .send(frame)
            .await
            .map_err(|_| ClientError::NotConnected)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Sender used when the socket could not be opened. REST features keep
/// working; every emit fails with `NotConnected`.
pub struct OfflineChannel;

#[async_trait]
impl RealtimeSender for OfflineChannel {
    async fn emit(&self, event: OutboundEvent) -> ClientResult<()> {
        debug!("Dropping {}: realtime channel offline", event.name());
        Err(ClientError::NotConnected)
    }

    fn is_connected(&self) -> bool {
        false
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        if let Ok(tasks) = self.tasks.get_mut() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

/// `http(s)://host[:port]` -> `ws(s)://host[:port]/socket.io/?EIO=4&transport=websocket`
pub fn socket_url(base: &Url) -> ClientResult<Url> {
    let mut url = base.join("/socket.io/")?;
    let scheme = match base.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|_| ClientError::Realtime(format!("cannot use scheme {} for {}", scheme, base)))?;
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket");
    Ok(url)
}
