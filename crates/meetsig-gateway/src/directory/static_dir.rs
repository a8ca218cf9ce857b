use std::collections::HashMap;

use async_trait::async_trait;

use meetsig_core::error::{Result, SignalError};

use super::{Claims, IdentityVerifier, Membership, RoomDirectory, RoomRecord};
use crate::config::DirectorySection;

/// In-memory directory compiled from the `directory` config section.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    tokens: HashMap<String, Claims>,
    rooms: HashMap<String, RoomRecord>,
    members: HashMap<(u64, u64), String>,
}

impl StaticDirectory {
    pub fn from_config(cfg: &DirectorySection) -> Self {
        let tokens = cfg
            .users
            .iter()
            .map(|u| (u.token.clone(), Claims { id: u.id, display_name: u.name.clone() }))
            .collect();

        let mut rooms = HashMap::with_capacity(cfg.rooms.len());
        let mut members = HashMap::new();
        for r in &cfg.rooms {
            rooms.insert(
                r.identity.clone(),
                RoomRecord {
                    identity: r.identity.clone(),
                    id: r.id,
                    begin_at: r.begin_at,
                    end_at: r.end_at,
                    owner_id: r.owner_id,
                },
            );
            for m in &r.members {
                members.insert((r.id, m.user_id), m.display_name.clone());
            }
        }

        Self { tokens, rooms, members }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[async_trait]
impl IdentityVerifier for StaticDirectory {
    async fn verify(&self, credential: &str) -> Result<Claims> {
        self.tokens
            .get(credential)
            .cloned()
            .ok_or_else(|| SignalError::Unauthorized("invalid token".into()))
    }
}

#[async_trait]
impl RoomDirectory for StaticDirectory {
    async fn resolve(&self, room_identity: &str) -> Result<RoomRecord> {
        self.rooms
            .get(room_identity)
            .cloned()
            .ok_or_else(|| SignalError::NotFound("room not found".into()))
    }
}

#[async_trait]
impl Membership for StaticDirectory {
    async fn is_member(&self, room_id: u64, user_id: u64) -> Result<bool> {
        Ok(self.members.contains_key(&(room_id, user_id)))
    }

    async fn display_name(&self, room_id: u64, user_id: u64) -> Result<Option<String>> {
        Ok(self.members.get(&(room_id, user_id)).cloned())
    }
}
