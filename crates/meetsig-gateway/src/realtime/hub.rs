//! Room registry.
//!
//! `room -> identity -> Connection` behind one reader/writer lock. Rooms are
//! derived state: an entry exists exactly while it has at least one peer.
//!
//! The lock is held only to mutate the map or snapshot targets. Socket
//! writes always happen after it is released, so a stalled peer cannot block
//! registry mutation or delivery to the rest of the room.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use meetsig_core::error::{Result, SignalError};
use meetsig_core::protocol::{keys, Envelope};

use crate::obs::RelayMetrics;
use crate::realtime::connection::Connection;

type RoomPeers = BTreeMap<String, Arc<Connection>>;

/// Result of removing a peer.
#[derive(Debug, Default)]
pub struct Departure {
    /// Peers still in the room after removal.
    pub remaining: Vec<Arc<Connection>>,
    /// False when the connection was not (or no longer) registered.
    pub removed: bool,
}

impl Departure {
    pub fn remaining_identities(&self) -> Vec<String> {
        self.remaining.iter().map(|c| c.identity().to_string()).collect()
    }
}

pub struct Hub {
    rooms: RwLock<HashMap<String, RoomPeers>>,
    metrics: Arc<RelayMetrics>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(Arc::new(RelayMetrics::default()))
    }
}

impl Hub {
    pub fn new(metrics: Arc<RelayMetrics>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Register `conn` under its room and identity.
    ///
    /// Returns the other identities present at that instant (sorted). A
    /// duplicate `(room, identity)` leaves the registry untouched; the caller
    /// owns closing the rejected connection.
    pub async fn join(&self, conn: &Arc<Connection>) -> Result<Vec<String>> {
        if conn.room().is_empty() || conn.identity().is_empty() {
            return Err(SignalError::EmptyIdentity);
        }

        let mut rooms = self.rooms.write().await;
        let peers = rooms.entry(conn.room().to_string()).or_default();

        if peers.contains_key(conn.identity()) {
            // the room already had this peer, so or_default created nothing
            self.metrics.duplicate_joins.inc(&[]);
            return Err(SignalError::Duplicate {
                room: conn.room().to_string(),
                user: conn.identity().to_string(),
            });
        }

        peers.insert(conn.identity().to_string(), Arc::clone(conn));
        self.metrics.peers_active.inc(&[]);

        Ok(peers
            .keys()
            .filter(|id| id.as_str() != conn.identity())
            .cloned()
            .collect())
    }

    /// `join` + presence notifications. On rejection the new connection gets
    /// an `error` envelope and is closed; the existing peer is unaffected.
    pub async fn admit(&self, conn: &Arc<Connection>) -> Result<()> {
        match self.join(conn).await {
            Ok(existing) => {
                info!(room = %conn.room(), user = %conn.identity(), peers = existing.len(), "peer joined");
                self.announce_join(conn, &existing).await;
                Ok(())
            }
            Err(e) => {
                warn!(room = %conn.room(), user = %conn.identity(), error = %e, "join rejected");
                match Envelope::error(conn.room(), &e.to_string()).and_then(|env| env.encode()) {
                    Ok(payload) => {
                        let _ = conn.send(&payload).await;
                    }
                    Err(enc) => warn!(error = %enc, "error envelope encode failed"),
                }
                conn.close().await;
                Err(e)
            }
        }
    }

    /// Send `peer_list` to the newcomer and `peer_joined` to everyone else.
    pub async fn announce_join(&self, conn: &Arc<Connection>, existing: &[String]) {
        match Envelope::peer_list(conn.room(), existing).and_then(|env| env.encode()) {
            Ok(payload) => {
                if let Err(e) = conn.send(&payload).await {
                    self.metrics.delivery_failures.inc(&[("kind", "peer_list")]);
                    warn!(user = %conn.identity(), error = %e, "send peer list failed");
                }
            }
            Err(e) => warn!(error = %e, "peer list encode failed"),
        }

        let payload = match Envelope::peer_joined(conn.room(), conn.identity()).and_then(|env| env.encode()) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "peer joined encode failed");
                return;
            }
        };
        let targets = self.select_targets(conn.room(), conn.identity(), "").await;
        self.deliver(&targets, &payload, "peer_joined").await;
    }

    /// Relay a participant's envelope.
    ///
    /// Routing fields are re-stamped from the sender's connection. With a
    /// target set, only that peer receives it (nobody, if absent); otherwise
    /// every other peer in the room does. Keys the relay originates itself
    /// (`peer_list`, `peer_left`, ...) are never accepted from a participant.
    pub async fn forward(&self, sender: &Connection, mut env: Envelope) -> usize {
        if keys::is_relay_reserved(env.key.trim()) {
            self.metrics.frames_dropped.inc(&[("reason", "reserved_key")]);
            debug!(room = %sender.room(), user = %sender.identity(), key = %env.key, "reserved key from participant, dropped");
            return 0;
        }

        env.stamp(sender.identity(), sender.room());
        env.system = false;

        let payload = match env.encode() {
            Ok(p) => p,
            Err(e) => {
                warn!(user = %sender.identity(), error = %e, "forward encode failed");
                return 0;
            }
        };

        let targets = self
            .select_targets(sender.room(), sender.identity(), &env.target_identity)
            .await;
        if targets.is_empty() && !env.target_identity.is_empty() {
            debug!(
                room = %sender.room(),
                user = %sender.identity(),
                target = %env.target_identity,
                key = %env.key,
                "target not in room, dropped"
            );
            return 0;
        }
        self.deliver(&targets, &payload, "forward").await
    }

    /// Deliver pre-serialized bytes to every peer in `room`.
    /// An unknown or empty room is a no-op.
    pub async fn broadcast(&self, room: &str, payload: &str) -> usize {
        let targets: Vec<Arc<Connection>> = {
            let rooms = self.rooms.read().await;
            match rooms.get(room) {
                Some(peers) => peers.values().cloned().collect(),
                None => return 0,
            }
        };
        self.deliver(&targets, payload, "broadcast").await
    }

    /// Remove `conn` if it still owns its slot. Idempotent.
    pub async fn leave(&self, conn: &Connection) -> Departure {
        let mut rooms = self.rooms.write().await;
        let Some(peers) = rooms.get_mut(conn.room()) else {
            return Departure::default();
        };

        match peers.get(conn.identity()) {
            Some(current) if current.id() == conn.id() => {}
            _ => return Departure::default(),
        }
        peers.remove(conn.identity());
        self.metrics.peers_active.dec(&[]);

        let remaining: Vec<Arc<Connection>> = peers.values().cloned().collect();
        if peers.is_empty() {
            rooms.remove(conn.room());
        }

        Departure { remaining, removed: true }
    }

    /// `leave` + one `peer_left` to each remaining peer.
    pub async fn depart(&self, conn: &Connection) -> bool {
        let departure = self.leave(conn).await;
        if !departure.removed {
            return false;
        }
        info!(room = %conn.room(), user = %conn.identity(), remaining = departure.remaining.len(), "peer left");

        match Envelope::peer_left(conn.room(), conn.identity()).and_then(|env| env.encode()) {
            Ok(payload) => {
                self.deliver(&departure.remaining, &payload, "peer_left").await;
            }
            Err(e) => warn!(error = %e, "peer left encode failed"),
        }
        true
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn peer_count(&self) -> usize {
        self.rooms.read().await.values().map(|p| p.len()).sum()
    }

    pub async fn contains_room(&self, room: &str) -> bool {
        self.rooms.read().await.contains_key(room)
    }

    /// Identities currently in `room`, sorted.
    pub async fn peers_in(&self, room: &str) -> Vec<String> {
        self.rooms
            .read()
            .await
            .get(room)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn select_targets(&self, room: &str, sender: &str, target: &str) -> Vec<Arc<Connection>> {
        let rooms = self.rooms.read().await;
        let Some(peers) = rooms.get(room) else {
            return Vec::new();
        };

        if !target.is_empty() {
            return peers.get(target).cloned().into_iter().collect();
        }

        peers
            .iter()
            .filter(|(id, _)| id.as_str() != sender)
            .map(|(_, c)| Arc::clone(c))
            .collect()
    }

    /// Write to every target concurrently. Failures are logged per target
    /// and never abort delivery to the others.
    async fn deliver(&self, targets: &[Arc<Connection>], payload: &str, kind: &'static str) -> usize {
        let mut sends: FuturesUnordered<_> = targets
            .iter()
            .map(|peer| async move { (peer, peer.send(payload).await) })
            .collect();

        let mut delivered = 0;
        while let Some((peer, res)) = sends.next().await {
            match res {
                Ok(()) => delivered += 1,
                Err(e) => {
                    self.metrics.delivery_failures.inc(&[("kind", kind)]);
                    warn!(room = %peer.room(), user = %peer.identity(), kind, error = %e, "delivery failed");
                }
            }
        }
        delivered
    }
}
