//! Engine.IO v4 / Socket.IO v5 text framing
//!
//! Every websocket text frame is one Engine.IO packet: a single digit type
//! followed by its payload. Engine `message` packets carry Socket.IO packets:
//!
//! ```text
//! <type>[<namespace>,][<ack id>][<json>]
//! 42["new_message",{"role":"user",...}]
//! ```
//!
//! Binary packet types are not used by the chat server and are rejected.

use reskit_core::{ReskitError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Default Socket.IO namespace
pub const ROOT_NAMESPACE: &str = "/";

/// Handshake sent by the server in the Engine.IO `open` packet
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    /// Engine session id
    pub sid: String,
    /// Transports the session may upgrade to
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server ping period in milliseconds
    pub ping_interval: u64,
    /// Time the server waits for a pong, in milliseconds
    pub ping_timeout: u64,
    /// Largest accepted payload in bytes
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// One Engine.IO packet
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    /// `0{...}`
    Open(OpenHandshake),
    /// `1`
    Close,
    /// `2[payload]`
    Ping(String),
    /// `3[payload]`
    Pong(String),
    /// `4<socket packet>`
    Message(String),
    /// `5`
    Upgrade,
    /// `6`
    Noop,
}

impl EnginePacket {
    /// Parse a websocket text frame
    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ReskitError::protocol("empty engine frame"))?;
        let payload = chars.as_str();
        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(payload)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(payload.to_string())),
            '3' => Ok(Self::Pong(payload.to_string())),
            '4' => Ok(Self::Message(payload.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(ReskitError::protocol(format!(
                "unknown engine packet type '{}'",
                other
            ))),
        }
    }

    /// Render as a websocket text frame
    pub fn encode(&self) -> String {
        match self {
            Self::Open(_) => "0".to_string(),
            Self::Close => "1".to_string(),
            Self::Ping(payload) => format!("2{}", payload),
            Self::Pong(payload) => format!("3{}", payload),
            Self::Message(body) => format!("4{}", body),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }
}

/// One Socket.IO packet
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// Namespace connect request, or the server's acceptance with `{sid}`
    Connect {
        /// Namespace
        namespace: String,
        /// Auth payload (client) or `{sid}` (server)
        data: Option<Value>,
    },
    /// Namespace disconnect
    Disconnect {
        /// Namespace
        namespace: String,
    },
    /// Named event with arguments
    Event {
        /// Namespace
        namespace: String,
        /// Acknowledgement id requested by the sender
        ack_id: Option<u64>,
        /// Event name
        name: String,
        /// Event arguments after the name
        args: Vec<Value>,
    },
    /// Acknowledgement of an earlier event
    Ack {
        /// Namespace
        namespace: String,
        /// Acknowledged id
        ack_id: u64,
        /// Reply arguments
        args: Vec<Value>,
    },
    /// Namespace connection refused
    ConnectError {
        /// Namespace
        namespace: String,
        /// Reason, usually `{message}`
        data: Value,
    },
}

impl SocketPacket {
    /// Event on the root namespace without acknowledgement
    pub fn event(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Event {
            namespace: ROOT_NAMESPACE.to_string(),
            ack_id: None,
            name: name.into(),
            args,
        }
    }

    /// Root namespace connect request
    pub fn connect() -> Self {
        Self::Connect {
            namespace: ROOT_NAMESPACE.to_string(),
            data: None,
        }
    }

    /// Root namespace disconnect
    pub fn disconnect() -> Self {
        Self::Disconnect {
            namespace: ROOT_NAMESPACE.to_string(),
        }
    }

    /// Parse the payload of an engine `message` packet
    pub fn decode(body: &str) -> Result<Self> {
        let mut chars = body.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ReskitError::protocol("empty socket packet"))?;
        let rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            return Err(ReskitError::protocol("binary socket packets are not supported"));
        }

        let (namespace, rest) = split_namespace(rest);
        let (ack_id, payload) = split_ack_id(rest);
        let data: Option<Value> = if payload.is_empty() {
            None
        } else {
            Some(serde_json::from_str(payload)?)
        };

        match kind {
            '0' => Ok(Self::Connect { namespace, data }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let mut items = match data {
                    Some(Value::Array(items)) if !items.is_empty() => items,
                    _ => return Err(ReskitError::protocol("event payload must be a non-empty array")),
                };
                let name = match items.remove(0) {
                    Value::String(name) => name,
                    _ => return Err(ReskitError::protocol("event name must be a string")),
                };
                Ok(Self::Event {
                    namespace,
                    ack_id,
                    name,
                    args: items,
                })
            }
            '3' => {
                let ack_id =
                    ack_id.ok_or_else(|| ReskitError::protocol("ack packet without id"))?;
                let args = match data {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                Ok(Self::Ack {
                    namespace,
                    ack_id,
                    args,
                })
            }
            '4' => Ok(Self::ConnectError {
                namespace,
                data: data.unwrap_or(Value::Null),
            }),
            other => Err(ReskitError::protocol(format!(
                "unknown socket packet type '{}'",
                other
            ))),
        }
    }

    /// Render as the payload of an engine `message` packet
    pub fn encode(&self) -> String {
        let mut out = String::new();
        let (kind, namespace) = match self {
            Self::Connect { namespace, .. } => ('0', namespace),
            Self::Disconnect { namespace } => ('1', namespace),
            Self::Event { namespace, .. } => ('2', namespace),
            Self::Ack { namespace, .. } => ('3', namespace),
            Self::ConnectError { namespace, .. } => ('4', namespace),
        };
        out.push(kind);
        if namespace != ROOT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        match self {
            Self::Connect { data, .. } => {
                if let Some(data) = data {
                    out.push_str(&data.to_string());
                }
            }
            Self::Disconnect { .. } => {}
            Self::Event {
                ack_id, name, args, ..
            } => {
                if let Some(id) = ack_id {
                    out.push_str(&id.to_string());
                }
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                out.push_str(&Value::Array(items).to_string());
            }
            Self::Ack { ack_id, args, .. } => {
                out.push_str(&ack_id.to_string());
                out.push_str(&Value::Array(args.clone()).to_string());
            }
            Self::ConnectError { data, .. } => out.push_str(&data.to_string()),
        }
        out
    }

    /// Wrap into an engine frame ready for the socket
    pub fn into_frame(self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }
}

fn split_namespace(rest: &str) -> (String, &str) {
    if !rest.starts_with('/') {
        return (ROOT_NAMESPACE.to_string(), rest);
    }
    match rest.find(',') {
        Some(idx) => (rest[..idx].to_string(), &rest[idx + 1..]),
        None => (rest.to_string(), ""),
    }
}

fn split_ack_id(rest: &str) -> (Option<u64>, &str) {
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return (None, rest);
    }
    (rest[..digits].parse().ok(), &rest[digits..])
}
