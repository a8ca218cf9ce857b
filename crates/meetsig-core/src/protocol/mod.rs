//! Signaling wire protocol.
//!
//! One JSON envelope per WebSocket frame. The relay only looks at the
//! routing fields; `value` stays an opaque raw JSON fragment end to end.

pub mod envelope;
pub mod keys;

pub use envelope::{now_millis, Envelope, SYSTEM_IDENTITY};
