//! External collaborators consulted before a peer is admitted.
//!
//! Identity, room scheduling and membership live outside the relay. The
//! gateway only depends on these traits; `StaticDirectory` backs them from
//! config for standalone deployments and tests.

mod static_dir;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use meetsig_core::error::Result;

pub use static_dir::StaticDirectory;

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub id: u64,
    pub display_name: String,
}

/// Scheduled room as stored by the room directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    pub identity: String,
    pub id: u64,
    pub begin_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub owner_id: u64,
}

/// Validates a presented credential.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// `Err(Unauthorized)` when the credential is invalid.
    async fn verify(&self, credential: &str) -> Result<Claims>;
}

/// Resolves room identities to scheduled rooms.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// `Err(NotFound)` when no such room exists.
    async fn resolve(&self, room_identity: &str) -> Result<RoomRecord>;
}

/// Room membership lookups.
#[async_trait]
pub trait Membership: Send + Sync {
    async fn is_member(&self, room_id: u64, user_id: u64) -> Result<bool>;
    async fn display_name(&self, room_id: u64, user_id: u64) -> Result<Option<String>>;
}
