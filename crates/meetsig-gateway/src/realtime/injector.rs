//! System event injection.
//!
//! Collaborators without a live connection (REST handlers, schedulers) use
//! this to push `system` envelopes into a room. An empty room is a no-op.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use meetsig_core::error::{Result, SignalError};
use meetsig_core::protocol::{keys, Envelope};

use crate::directory::RoomDirectory;
use crate::policy::JoinWindow;
use crate::realtime::hub::Hub;

/// Active screen share as announced to the room.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShareInfo {
    pub owner_id: u64,
    pub owner_name: String,
    pub stream_id: String,
    pub started_at: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShareEnded {
    pub owner_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub ended_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenShareEvent {
    Started(ShareInfo),
    Refreshed(ShareInfo),
    Stopped(ShareEnded),
}

impl ScreenShareEvent {
    pub fn key(&self) -> &'static str {
        match self {
            ScreenShareEvent::Started(_) => keys::SCREEN_SHARE_STARTED,
            ScreenShareEvent::Refreshed(_) => keys::SCREEN_SHARE_REFRESHED,
            ScreenShareEvent::Stopped(_) => keys::SCREEN_SHARE_STOPPED,
        }
    }
}

pub struct EventInjector {
    hub: Arc<Hub>,
    rooms: Arc<dyn RoomDirectory>,
    window: JoinWindow,
}

impl EventInjector {
    pub fn new(hub: Arc<Hub>, rooms: Arc<dyn RoomDirectory>, window: JoinWindow) -> Self {
        Self { hub, rooms, window }
    }

    /// Broadcast a `system` envelope to every peer in `room`.
    /// Returns how many peers it was written to.
    pub async fn notify<T>(&self, room: &str, key: &str, value: &T) -> Result<usize>
    where
        T: Serialize + ?Sized + Sync,
    {
        if room.is_empty() {
            return Err(SignalError::EmptyIdentity);
        }
        let payload = Envelope::system(room, key, value)?.encode()?;
        let delivered = self.hub.broadcast(room, &payload).await;
        debug!(room, key, delivered, "system event injected");
        Ok(delivered)
    }

    /// Like `notify`, but only while the room exists and its window is open.
    pub async fn notify_live<T>(&self, room: &str, key: &str, value: &T) -> Result<usize>
    where
        T: Serialize + ?Sized + Sync,
    {
        let record = self.rooms.resolve(room).await?;
        self.window
            .check_room(&record, Utc::now())
            .map_err(SignalError::OutOfWindow)?;
        self.notify(room, key, value).await
    }

    /// Start/refresh require a live room; a stop is always announced so
    /// clients can tear down state after the meeting ends.
    pub async fn screen_share(&self, room: &str, event: &ScreenShareEvent) -> Result<usize> {
        match event {
            ScreenShareEvent::Started(info) | ScreenShareEvent::Refreshed(info) => {
                self.notify_live(room, event.key(), info).await
            }
            ScreenShareEvent::Stopped(ended) => self.notify(room, event.key(), ended).await,
        }
    }
}
