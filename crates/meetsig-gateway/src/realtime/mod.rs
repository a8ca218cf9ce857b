//! Realtime relay runtime.
//!
//! `Hub` owns the room -> peer map, `Connection` owns one peer's write side,
//! and `EventInjector` lets in-process collaborators push system events.

pub mod connection;
pub mod hub;
pub mod injector;

pub use connection::{Connection, FrameSink};
pub use hub::{Departure, Hub};
pub use injector::{EventInjector, ScreenShareEvent, ShareEnded, ShareInfo};
