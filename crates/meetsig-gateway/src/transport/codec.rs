//! Decode-once codec for inbound frames.
//!
//! - Socket messages are normalized to `Frame` so the session loop does not
//!   depend on the WebSocket library.
//! - Payload frames (text or binary) are size-checked before any JSON work.

use axum::extract::ws::Message;

use meetsig_core::protocol::Envelope;

/// Transport-neutral inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping,
    Pong,
    Close,
}

impl From<Message> for Frame {
    fn from(msg: Message) -> Self {
        match msg {
            Message::Text(s) => Frame::Text(s),
            Message::Binary(b) => Frame::Binary(b),
            Message::Ping(_) => Frame::Ping,
            Message::Pong(_) => Frame::Pong,
            Message::Close(_) => Frame::Close,
        }
    }
}

/// Why an inbound payload was not forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    Empty,
    Oversized(usize),
    Malformed(String),
    NoKey,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::Empty => "empty",
            DropReason::Oversized(_) => "oversized",
            DropReason::Malformed(_) => "malformed",
            DropReason::NoKey => "no_key",
        }
    }
}

#[derive(Debug)]
pub enum Inbound {
    Envelope(Envelope),
    Drop(DropReason),
}

/// Classify one payload. Oversized frames are never parsed.
pub fn decode(raw: &[u8], max_payload_bytes: usize) -> Inbound {
    if raw.is_empty() {
        return Inbound::Drop(DropReason::Empty);
    }
    if raw.len() > max_payload_bytes {
        return Inbound::Drop(DropReason::Oversized(raw.len()));
    }
    match Envelope::decode(raw) {
        Ok(env) if env.has_key() => Inbound::Envelope(env),
        Ok(_) => Inbound::Drop(DropReason::NoKey),
        Err(e) => Inbound::Drop(DropReason::Malformed(e.to_string())),
    }
}
