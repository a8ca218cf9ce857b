//! Room time-window policy.
//!
//! A room is open from `begin_at - early` through `end_at` (the end instant
//! itself still admits). Anything earlier is "not yet open", anything later
//! is "already ended".

use chrono::{DateTime, Duration, Utc};

use meetsig_core::error::WindowError;

use crate::directory::RoomRecord;

const MAX_EARLY_SECS: u64 = 24 * 3600;

#[derive(Debug, Clone, Copy)]
pub struct JoinWindow {
    early: Duration,
}

impl JoinWindow {
    pub fn new(early: Duration) -> Self {
        Self { early }
    }

    /// Clamped to one day, the largest value config accepts.
    pub fn from_secs(early_secs: u64) -> Self {
        Self::new(Duration::seconds(early_secs.min(MAX_EARLY_SECS) as i64))
    }

    pub fn check(
        &self,
        begin_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), WindowError> {
        if now > end_at {
            return Err(WindowError::AlreadyEnded);
        }
        let opens_at = begin_at.checked_sub_signed(self.early).unwrap_or(DateTime::<Utc>::MIN_UTC);
        if now < opens_at {
            return Err(WindowError::NotYetOpen);
        }
        Ok(())
    }

    pub fn check_room(&self, room: &RoomRecord, now: DateTime<Utc>) -> Result<(), WindowError> {
        self.check(room.begin_at, room.end_at, now)
    }
}

impl Default for JoinWindow {
    fn default() -> Self {
        Self::from_secs(15 * 60)
    }
}
