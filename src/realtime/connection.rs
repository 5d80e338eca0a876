// Realtime connection management
// Contains connect, disconnect and the reader/writer tasks for RealtimeClient

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, COOKIE};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::connect_async;
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::realtime::events::ServerEvent;
use crate::realtime::packet::{self, EnginePacket, SocketPacket};
use crate::realtime::{socket_url, RealtimeClient};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

impl RealtimeClient {
    /// Open the Socket.IO connection for the session identified by `cookie`.
    ///
    /// Returns the client and the receiver of inbound events. The receiver
    /// yields `ServerEvent::Connected` first and `ServerEvent::Disconnected`
    /// once the socket closes.
    pub async fn connect(base: &Url, cookie: Option<&str>) -> ClientResult<(Self, mpsc::Receiver<ServerEvent>)> {
        let url = socket_url(base)?;
        info!("Connecting realtime channel to {}", url);

        let mut request = url.as_str().into_client_request()?;
        if let Some(cookie) = cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ClientError::Realtime(format!("invalid cookie header: {}", e)))?;
            request.headers_mut().insert(COOKIE, value);
        }

        let (stream, _response) = tokio::time::timeout(HANDSHAKE_TIMEOUT, connect_async(request))
            .await
            .map_err(|_| ClientError::Realtime("timed out opening websocket".to_string()))??;
        let (mut write, mut read) = stream.split();

        // Engine.IO open, then Socket.IO connect on the default namespace
        let handshake = match next_packet(&mut read).await? {
            EnginePacket::Open(handshake) => handshake,
            other => {
                return Err(ClientError::Realtime(format!("expected open packet, got {:?}", other)));
            }
        };
        debug!(
            "Engine.IO session {} (ping every {}ms)",
            handshake.sid, handshake.ping_interval
        );

        write
            .send(WsMessage::text(packet::encode(&EnginePacket::Message(SocketPacket::connect()))))
            .await?;

        loop {
            match next_packet(&mut read).await? {
                EnginePacket::Message(SocketPacket::Connect { .. }) => break,
                EnginePacket::Message(SocketPacket::ConnectError { data, .. }) => {
                    let reason = data
                        .get("message")
                        .and_then(|m| m.as_str())
                        .unwrap_or("connection refused")
                        .to_string();
                    error!("Realtime connect rejected: {}", reason);
                    return Err(ClientError::Realtime(reason));
                }
                EnginePacket::Ping(probe) => {
                    write
                        .send(WsMessage::text(packet::encode(&EnginePacket::Pong(probe))))
                        .await?;
                }
                other => debug!("Ignoring {:?} during connect", other),
            }
        }
        info!("Realtime channel connected");

        let connected = Arc::new(AtomicBool::new(true));
        let (frame_tx, mut frame_rx) = mpsc::channel::<String>(100);
        let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(100);

        if let Err(e) = event_tx.send(ServerEvent::Connected).await {
            warn!("Event receiver dropped before connect: {}", e);
        }

        let writer_connected = connected.clone();
        let writer = tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                if let Err(e) = write.send(WsMessage::text(frame)).await {
                    error!("Failed to write realtime frame: {}", e);
                    break;
                }
            }
            writer_connected.store(false, Ordering::SeqCst);
            let _ = write.close().await;
            debug!("Realtime writer stopped");
        });

        let reader_connected = connected.clone();
        let pong_tx = frame_tx.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                let text = match frame {
                    Ok(WsMessage::Text(text)) => text,
                    Ok(WsMessage::Close(reason)) => {
                        info!("Realtime channel closed by server: {:?}", reason);
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        error!("Realtime channel read error: {}", e);
                        break;
                    }
                };

                match packet::decode(text.as_str()) {
                    Ok(EnginePacket::Ping(probe)) => {
                        let pong = packet::encode(&EnginePacket::Pong(probe));
                        if pong_tx.send(pong).await.is_err() {
                            break;
                        }
                    }
                    Ok(EnginePacket::Message(SocketPacket::Event { name, data, .. })) => {
                        match ServerEvent::from_named(&name, data) {
                            Ok(Some(event)) => {
                                if event_tx.send(event).await.is_err() {
                                    debug!("Event receiver dropped, stopping reader");
                                    break;
                                }
                            }
                            Ok(None) => debug!("Ignoring unknown event {}", name),
                            Err(e) => warn!("Malformed {} event: {}", name, e),
                        }
                    }
                    Ok(EnginePacket::Message(SocketPacket::Disconnect { .. })) | Ok(EnginePacket::Close) => {
                        info!("Server ended the realtime session");
                        break;
                    }
                    Ok(other) => debug!("Ignoring packet {:?}", other),
                    Err(e) => warn!("Undecodable realtime frame {:?}: {}", text.as_str(), e),
                }
            }
            reader_connected.store(false, Ordering::SeqCst);
            let _ = event_tx.send(ServerEvent::Disconnected).await;
        });

        Ok((
            RealtimeClient {
                sid: handshake.sid,
                frame_tx,
                connected,
                tasks: Mutex::new(vec![reader, writer]),
            },
            event_rx,
        ))
    }

    /// Tell the server we are leaving and tear the socket down.
    pub async fn disconnect(&self) {
        info!("Disconnecting realtime channel");
        if self.connected.swap(false, Ordering::SeqCst) {
            let bye = packet::encode(&EnginePacket::Message(SocketPacket::Disconnect { namespace: None }));
            if let Err(e) = self.frame_tx.send(bye).await {
                debug!("Writer already gone: {}", e);
            }
            // Give the writer a moment to flush the disconnect packet
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => return,
        };
        for task in tasks {
            task.abort();
        }
    }
}

async fn next_packet<S>(read: &mut S) -> ClientResult<EnginePacket>
where
    S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let fut = async {
        loop {
            match read.next().await {
                Some(Ok(WsMessage::Text(text))) => return packet::decode(text.as_str()),
                Some(Ok(WsMessage::Close(_))) | None => {
                    return Err(ClientError::Realtime("socket closed during handshake".to_string()));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    };
    tokio::time::timeout(HANDSHAKE_TIMEOUT, fut)
        .await
        .map_err(|_| ClientError::Realtime("timed out waiting for handshake".to_string()))?
}
