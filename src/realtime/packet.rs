// Engine.IO v4 / Socket.IO v5 text packet codec
//
// A WebSocket text frame carries exactly one Engine.IO packet: a single digit
// type followed by its payload. Engine.IO `4` (message) wraps a Socket.IO
// packet, which is again a type digit, an optional `/namespace,`, an optional
// ack id and a JSON payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

/// Payload of the Engine.IO open packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect { namespace: Option<String>, data: Option<Value> },
    Disconnect { namespace: Option<String> },
    Event {
        namespace: Option<String>,
        ack: Option<u64>,
        name: String,
        data: Value,
    },
    Ack {
        namespace: Option<String>,
        id: u64,
        data: Value,
    },
    ConnectError { namespace: Option<String>, data: Value },
}

impl SocketPacket {
    pub fn connect() -> Self {
        SocketPacket::Connect { namespace: None, data: None }
    }

    pub fn event(name: &str, data: Value) -> Self {
        SocketPacket::Event {
            namespace: None,
            ack: None,
            name: name.to_string(),
            data,
        }
    }
}

pub fn decode(frame: &str) -> ClientResult<EnginePacket> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| ClientError::Decode("empty frame".to_string()))?;
    let rest = chars.as_str();
    match kind {
        '0' => Ok(EnginePacket::Open(serde_json::from_str(rest)?)),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(rest.to_string())),
        '3' => Ok(EnginePacket::Pong(rest.to_string())),
        '4' => Ok(EnginePacket::Message(decode_socket(rest)?)),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(ClientError::Decode(format!("unknown engine packet type {:?}", other))),
    }
}

pub fn encode(packet: &EnginePacket) -> String {
    match packet {
        EnginePacket::Open(handshake) => {
            format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
        }
        EnginePacket::Close => "1".to_string(),
        EnginePacket::Ping(probe) => format!("2{}", probe),
        EnginePacket::Pong(probe) => format!("3{}", probe),
        EnginePacket::Message(socket) => format!("4{}", encode_socket(socket)),
        EnginePacket::Upgrade => "5".to_string(),
        EnginePacket::Noop => "6".to_string(),
    }
}

fn decode_socket(body: &str) -> ClientResult<SocketPacket> {
    let mut chars = body.chars();
    let kind = chars
        .next()
        .ok_or_else(|| ClientError::Decode("empty socket packet".to_string()))?;
    let (namespace, rest) = split_namespace(chars.as_str());
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let ack = if digits > 0 {
        Some(
            rest[..digits]
                .parse::<u64>()
                .map_err(|e| ClientError::Decode(e.to_string()))?,
        )
    } else {
        None
    };
    let payload = &rest[digits..];

    match kind {
        '0' => Ok(SocketPacket::Connect {
            namespace,
            data: parse_optional(payload)?,
        }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let (name, data) = split_event(payload)?;
            Ok(SocketPacket::Event { namespace, ack, name, data })
        }
        '3' => {
            let id = ack.ok_or_else(|| ClientError::Decode("ack without id".to_string()))?;
            Ok(SocketPacket::Ack {
                namespace,
                id,
                data: parse_optional(payload)?.unwrap_or(Value::Null),
            })
        }
        '4' => Ok(SocketPacket::ConnectError {
            namespace,
            data: parse_optional(payload)?.unwrap_or(Value::Null),
        }),
        '5' | '6' => Err(ClientError::Decode("binary packets are not supported".to_string())),
        other => Err(ClientError::Decode(format!("unknown socket packet type {:?}", other))),
    }
}

fn encode_socket(packet: &SocketPacket) -> String {
    fn prefix(kind: char, namespace: &Option<String>) -> String {
        match namespace {
            Some(ns) if ns != "/" => format!("{}{},", kind, ns),
            _ => kind.to_string(),
        }
    }

    match packet {
        SocketPacket::Connect { namespace, data } => {
            let mut out = prefix('0', namespace);
            if let Some(data) = data {
                out.push_str(&data.to_string());
            }
            out
        }
        SocketPacket::Disconnect { namespace } => prefix('1', namespace),
        SocketPacket::Event { namespace, ack, name, data } => {
            let mut out = prefix('2', namespace);
            if let Some(id) = ack {
                out.push_str(&id.to_string());
            }
            let array = match data {
                Value::Null => Value::Array(vec![Value::String(name.clone())]),
                other => Value::Array(vec![Value::String(name.clone()), other.clone()]),
            };
            out.push_str(&array.to_string());
            out
        }
        SocketPacket::Ack { namespace, id, data } => {
            format!("{}{}{}", prefix('3', namespace), id, Value::Array(vec![data.clone()]))
        }
        SocketPacket::ConnectError { namespace, data } => {
            format!("{}{}", prefix('4', namespace), data)
        }
    }
}

/// `/chat,rest` -> (Some("/chat"), "rest"); anything else is the default namespace.
fn split_namespace(rest: &str) -> (Option<String>, &str) {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(idx) => (Some(rest[..idx].to_string()), &rest[idx + 1..]),
            None => (Some(rest.to_string()), ""),
        }
    } else {
        (None, rest)
    }
}

fn parse_optional(payload: &str) -> ClientResult<Option<Value>> {
    if payload.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::from_str(payload)?))
    }
}

/// Event payload is `["name", arg?, ...]`; only the first argument is kept.
fn split_event(payload: &str) -> ClientResult<(String, Value)> {
    let value: Value = serde_json::from_str(payload)?;
    let mut items = match value {
        Value::Array(items) => items.into_iter(),
        _ => return Err(ClientError::Decode("event payload is not an array".to_string())),
    };
    let name = match items.next() {
        Some(Value::String(name)) => name,
        _ => return Err(ClientError::Decode("event without a name".to_string())),
    };
    Ok((name, items.next().unwrap_or(Value::Null)))
}
