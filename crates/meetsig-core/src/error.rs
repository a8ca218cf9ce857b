//! Shared error type across meetsig crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientCode {
    /// Missing or malformed input.
    BadRequest,
    /// Credential missing or rejected.
    Unauthorized,
    /// Room does not exist.
    NotFound,
    /// Authenticated but not entitled to the room.
    Forbidden,
    /// Slot already taken by a live connection.
    Conflict,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "bad_request",
            ClientCode::Unauthorized => "unauthorized",
            ClientCode::NotFound => "not_found",
            ClientCode::Forbidden => "forbidden",
            ClientCode::Conflict => "conflict",
            ClientCode::Internal => "internal",
        }
    }
}

/// Why a room refuses traffic at the current instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowError {
    NotYetOpen,
    AlreadyEnded,
}

impl WindowError {
    pub fn as_str(self) -> &'static str {
        match self {
            WindowError::NotYetOpen => "not_yet_open",
            WindowError::AlreadyEnded => "already_ended",
        }
    }
}

impl std::fmt::Display for WindowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowError::NotYetOpen => f.write_str("meeting is not open for participants yet"),
            WindowError::AlreadyEnded => f.write_str("meeting has already ended"),
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SignalError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("{0}")]
    OutOfWindow(WindowError),
    #[error("room or user identity is empty")]
    EmptyIdentity,
    #[error("user {user} already connected in room {room}")]
    Duplicate { room: String, user: String },
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("transport: {0}")]
    Transport(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl SignalError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            SignalError::BadRequest(_)
            | SignalError::OutOfWindow(_)
            | SignalError::EmptyIdentity
            | SignalError::UnsupportedVersion => ClientCode::BadRequest,
            SignalError::Unauthorized(_) => ClientCode::Unauthorized,
            SignalError::NotFound(_) => ClientCode::NotFound,
            SignalError::Forbidden(_) => ClientCode::Forbidden,
            SignalError::Duplicate { .. } => ClientCode::Conflict,
            SignalError::Transport(_) | SignalError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Finer-grained reason for out-of-window rejections.
    pub fn detail(&self) -> Option<&'static str> {
        match self {
            SignalError::OutOfWindow(w) => Some(w.as_str()),
            _ => None,
        }
    }
}
