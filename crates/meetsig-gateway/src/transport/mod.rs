//! Transport layer (WebSocket).
//!
//! The handshake gate runs before upgrade; after upgrade the session loop
//! owns the read half and the `Connection` owns the write half.

pub mod codec;
pub mod handshake;
pub mod session;
pub mod ws;
