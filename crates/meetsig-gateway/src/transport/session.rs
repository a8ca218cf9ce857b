//! Per-connection read loop.
//!
//! Runs for the lifetime of one peer: decodes inbound frames, hands
//! envelopes to the hub, pings on an interval and enforces the liveness
//! deadline. However the loop ends, the channel is closed and the peer
//! departs the hub exactly once.

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use meetsig_core::error::Result;

use crate::config::GatewaySection;
use crate::realtime::{Connection, Hub};
use crate::transport::codec::{decode, DropReason, Frame, Inbound};

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub ping_every: Duration,
    /// Re-armed on every inbound frame, pongs included.
    pub liveness_timeout: Duration,
    pub max_payload_bytes: usize,
}

impl SessionConfig {
    pub fn from_gateway(gw: &GatewaySection) -> Self {
        Self {
            ping_every: Duration::from_millis(gw.ping_interval_ms),
            liveness_timeout: Duration::from_millis(gw.liveness_timeout_ms),
            max_payload_bytes: gw.max_payload_bytes,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_gateway(&GatewaySection::default())
    }
}

/// Why a read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Closed,
    TimedOut,
    ReadFailed,
    PingFailed,
}

/// Runs cleanup from `Drop` if the session future is cancelled mid-loop.
struct CleanupGuard {
    hub: Arc<Hub>,
    conn: Arc<Connection>,
    armed: bool,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let hub = Arc::clone(&self.hub);
        let conn = Arc::clone(&self.conn);
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            rt.spawn(async move {
                conn.close().await;
                hub.depart(&conn).await;
            });
        }
    }
}

/// Drive `conn` until its inbound stream ends, fails, or goes quiet.
pub async fn run<S>(hub: Arc<Hub>, conn: Arc<Connection>, inbound: S, cfg: SessionConfig) -> LoopExit
where
    S: Stream<Item = Result<Frame>> + Unpin + Send,
{
    let mut guard = CleanupGuard {
        hub: Arc::clone(&hub),
        conn: Arc::clone(&conn),
        armed: true,
    };

    let exit = pump(&hub, &conn, inbound, &cfg).await;

    conn.close().await;
    hub.depart(&conn).await;
    guard.armed = false;

    exit
}

async fn pump<S>(hub: &Hub, conn: &Connection, mut inbound: S, cfg: &SessionConfig) -> LoopExit
where
    S: Stream<Item = Result<Frame>> + Unpin + Send,
{
    let mut deadline = Instant::now() + cfg.liveness_timeout;
    let mut ping_tick = tokio::time::interval_at(Instant::now() + cfg.ping_every, cfg.ping_every);
    ping_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            incoming = inbound.next() => {
                let frame = match incoming {
                    None => return LoopExit::Closed,
                    Some(Err(e)) => {
                        debug!(user = %conn.identity(), error = %e, "read failed");
                        return LoopExit::ReadFailed;
                    }
                    Some(Ok(frame)) => frame,
                };

                deadline = Instant::now() + cfg.liveness_timeout;

                match frame {
                    Frame::Text(s) => handle_payload(hub, conn, s.as_bytes(), cfg).await,
                    Frame::Binary(b) => handle_payload(hub, conn, &b, cfg).await,
                    Frame::Ping | Frame::Pong => {}
                    Frame::Close => return LoopExit::Closed,
                }
            }

            _ = tokio::time::sleep_until(deadline) => {
                debug!(user = %conn.identity(), "liveness deadline expired");
                return LoopExit::TimedOut;
            }

            _ = ping_tick.tick() => {
                if let Err(e) = conn.ping().await {
                    debug!(user = %conn.identity(), error = %e, "ping failed");
                    return LoopExit::PingFailed;
                }
            }
        }
    }
}

async fn handle_payload(hub: &Hub, conn: &Connection, raw: &[u8], cfg: &SessionConfig) {
    match decode(raw, cfg.max_payload_bytes) {
        Inbound::Envelope(env) => {
            hub.forward(conn, env).await;
        }
        Inbound::Drop(reason) => {
            hub.metrics().frames_dropped.inc(&[("reason", reason.as_str())]);
            match reason {
                DropReason::Oversized(len) => {
                    warn!(user = %conn.identity(), len, limit = cfg.max_payload_bytes, "dropped oversized payload");
                }
                DropReason::Malformed(e) => {
                    warn!(user = %conn.identity(), error = %e, "dropped invalid json payload");
                }
                DropReason::Empty | DropReason::NoKey => {}
            }
        }
    }
}
