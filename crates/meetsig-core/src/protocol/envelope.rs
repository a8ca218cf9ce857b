//! Signaling envelope (JSON).
//!
//! `value` is kept as `RawValue` so the relay never re-parses payloads it
//! does not interpret (SDP blobs, ICE candidates, app events).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::{to_raw_value, RawValue};

use crate::error::{Result, SignalError};
use crate::protocol::keys;

/// Sender identity stamped on relay-originated envelopes.
pub const SYSTEM_IDENTITY: &str = "system";

/// Wire unit exchanged over a signaling connection.
///
/// Inbound envelopes may omit every field except `key`, and may send `null`
/// for any of them; routing fields are overwritten by the relay before
/// anything is forwarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sender_identity: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub room_identity: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(default)]
    pub value: Option<Box<RawValue>>,
    /// Empty means "everyone in the room except the sender".
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub target_identity: String,
    /// Unix epoch milliseconds, assigned by the relay.
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: i64,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_false"
    )]
    pub system: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn null_as_default<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

/// Current wall clock in Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl Envelope {
    /// Decode one inbound frame.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw)
            .map_err(|e| SignalError::BadRequest(format!("invalid envelope json: {e}")))
    }

    /// Serialize once; the same string is written to every target.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| SignalError::Internal(format!("envelope encode failed: {e}")))
    }

    /// Whether the key carries anything besides whitespace.
    pub fn has_key(&self) -> bool {
        !self.key.trim().is_empty()
    }

    /// Overwrite routing fields with relay-known values.
    pub fn stamp(&mut self, sender: &str, room: &str) {
        self.sender_identity = sender.to_string();
        self.room_identity = room.to_string();
        self.timestamp = now_millis();
    }

    /// Raw JSON text of `value` (`null` when absent).
    pub fn value_str(&self) -> &str {
        self.value.as_deref().map(RawValue::get).unwrap_or("null")
    }

    /// Relay-originated envelope attributed to `sender`.
    pub fn relay<T: Serialize + ?Sized>(sender: &str, room: &str, key: &str, value: &T) -> Result<Self> {
        if key.trim().is_empty() {
            return Err(SignalError::BadRequest("envelope key must not be empty".into()));
        }
        let value = to_raw_value(value)
            .map_err(|e| SignalError::Internal(format!("value encode failed: {e}")))?;
        Ok(Self {
            sender_identity: sender.to_string(),
            room_identity: room.to_string(),
            key: key.to_string(),
            value: Some(value),
            target_identity: String::new(),
            timestamp: now_millis(),
            system: true,
        })
    }

    /// Envelope from the synthetic `system` identity.
    pub fn system<T: Serialize + ?Sized>(room: &str, key: &str, value: &T) -> Result<Self> {
        Self::relay(SYSTEM_IDENTITY, room, key, value)
    }

    pub fn peer_list(room: &str, peers: &[String]) -> Result<Self> {
        Self::system(room, keys::PEER_LIST, &serde_json::json!({ "peers": peers }))
    }

    pub fn peer_joined(room: &str, user: &str) -> Result<Self> {
        Self::relay(user, room, keys::PEER_JOINED, &serde_json::json!({ "user_identity": user }))
    }

    pub fn peer_left(room: &str, user: &str) -> Result<Self> {
        Self::relay(user, room, keys::PEER_LEFT, &serde_json::json!({ "user_identity": user }))
    }

    pub fn error(room: &str, message: &str) -> Result<Self> {
        Self::system(room, keys::ERROR, &serde_json::json!({ "message": message }))
    }
}
