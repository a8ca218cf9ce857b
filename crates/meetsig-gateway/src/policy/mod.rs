//! Admission policy.
//!
//! Currently the room time window shared by the handshake gate and the
//! event injector.

pub mod window;

pub use window::JoinWindow;
