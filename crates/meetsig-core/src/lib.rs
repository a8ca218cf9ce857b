//! meetsig core: transport-agnostic signaling envelope, reserved keys, and
//! the shared error surface.
//!
//! The gateway, the facade crate, and embedding services all speak these
//! types. Nothing here depends on a runtime or a socket library.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here.
//! Malformed input surfaces as `SignalError` instead.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ClientCode, Result, SignalError, WindowError};
