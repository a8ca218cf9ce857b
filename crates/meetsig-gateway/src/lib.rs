//! meetsig gateway library entry.
//!
//! Wires the handshake gate, WebSocket transport, room hub and event
//! injector into one signaling relay. Consumed by the binary (`main.rs`),
//! by embedders that call the injector in-process, and by integration tests.

pub mod app_state;
pub mod config;
pub mod directory;
pub mod obs;
pub mod ops;
pub mod policy;
pub mod realtime;
pub mod router;
pub mod transport;
