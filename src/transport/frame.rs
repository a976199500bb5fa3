//! Engine.IO v4 / Socket.IO v5 text frame codec
//!
//! Only the default namespace and text frames are handled. Layout:
//! - `0{...}` engine open, `1` close, `2` ping, `3` pong, `6` noop
//! - `4` + socket packet: `0{...}` connect, `1` disconnect,
//!   `2[id]["name",payload]` event, `3id[payload]` ack, `4{...}` connect error

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Value),
    Close,
    Ping,
    Pong,
    Noop,
    Connect(Option<Value>),
    Disconnect,
    Event {
        ack_id: Option<u64>,
        name: String,
        payload: Value,
    },
    Ack {
        id: u64,
        payload: Value,
    },
    ConnectError(String),
}

/// Parse one text frame. Returns `None` for frames this client cannot use.
pub fn parse(frame: &str) -> Option<Packet> {
    let mut chars = frame.chars();
    let engine = chars.next()?;
    let rest = chars.as_str();
    match engine {
        '0' => serde_json::from_str(rest).ok().map(Packet::Open),
        '1' => Some(Packet::Close),
        '2' => Some(Packet::Ping),
        '3' => Some(Packet::Pong),
        '6' => Some(Packet::Noop),
        '4' => parse_socket_packet(rest),
        _ => None,
    }
}

fn parse_socket_packet(packet: &str) -> Option<Packet> {
    let mut chars = packet.chars();
    let kind = chars.next()?;
    let body = skip_namespace(chars.as_str());
    match kind {
        '0' => Some(Packet::Connect(serde_json::from_str(body).ok())),
        '1' => Some(Packet::Disconnect),
        '2' => {
            let (ack_id, json) = split_ack_id(body);
            let mut items = match serde_json::from_str::<Value>(json).ok()? {
                Value::Array(items) => items.into_iter(),
                _ => return None,
            };
            let name = items.next()?.as_str()?.to_string();
            let payload = items.next().unwrap_or(Value::Null);
            Some(Packet::Event {
                ack_id,
                name,
                payload,
            })
        }
        '3' => {
            let (id, json) = split_ack_id(body);
            let payload = match serde_json::from_str::<Value>(json).ok()? {
                Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
                Value::Array(_) => Value::Null,
                other => other,
            };
            Some(Packet::Ack { id: id?, payload })
        }
        '4' => {
            let detail = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or_else(|| body.to_string());
            Some(Packet::ConnectError(detail))
        }
        _ => None,
    }
}

/// Drop a `/namespace,` prefix if present.
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(pos) => &body[pos + 1..],
            None => "",
        }
    } else {
        body
    }
}

/// Split leading ack digits from the JSON body.
fn split_ack_id(body: &str) -> (Option<u64>, &str) {
    let digits = body.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return (None, body);
    }
    (body[..digits].parse().ok(), &body[digits..])
}

/// Namespace connect, optionally carrying an auth object.
pub fn encode_connect(auth: Option<&Value>) -> String {
    match auth {
        Some(auth) => format!("40{}", auth),
        None => "40".to_string(),
    }
}

/// Event frame; with `ack_id` the peer is asked to acknowledge.
pub fn encode_event(name: &str, payload: &Value, ack_id: Option<u64>) -> String {
    let body = Value::Array(vec![Value::String(name.to_string()), payload.clone()]);
    match ack_id {
        Some(id) => format!("42{}{}", id, body),
        None => format!("42{}", body),
    }
}

/// Acknowledge a server event that asked for one.
pub fn encode_ack(id: u64, payload: &Value) -> String {
    format!("43{}{}", id, Value::Array(vec![payload.clone()]))
}

pub fn encode_pong() -> &'static str {
    "3"
}
