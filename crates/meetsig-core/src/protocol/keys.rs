//! Reserved envelope keys.
//!
//! The first four are produced by the relay itself. Screen-share keys are
//! application events injected by collaborators; the relay treats their
//! payloads as opaque like any other key.

pub const PEER_LIST: &str = "peer_list";
pub const PEER_JOINED: &str = "peer_joined";
pub const PEER_LEFT: &str = "peer_left";
pub const ERROR: &str = "error";

pub const SCREEN_SHARE_STARTED: &str = "screen_share_started";
pub const SCREEN_SHARE_STOPPED: &str = "screen_share_stopped";
pub const SCREEN_SHARE_REFRESHED: &str = "screen_share_refreshed";

/// Keys only the relay may originate.
pub fn is_relay_reserved(key: &str) -> bool {
    matches!(key, PEER_LIST | PEER_JOINED | PEER_LEFT | ERROR)
}
