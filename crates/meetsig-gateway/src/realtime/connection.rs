use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use meetsig_core::error::Result;

/// Write half of a peer's duplex channel.
///
/// Implementations write one logical message per call. Callers never share a
/// sink directly; `Connection` serializes access.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;
    async fn send_ping(&mut self) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// One peer inside one room.
pub struct Connection {
    id: u64,
    room: String,
    identity: String,
    sink: Mutex<Box<dyn FrameSink>>,
}

impl Connection {
    pub fn new(room: impl Into<String>, identity: impl Into<String>, sink: impl FrameSink + 'static) -> Arc<Self> {
        let sink: Box<dyn FrameSink> = Box::new(sink);
        Arc::new(Self {
            id: NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed),
            room: room.into(),
            identity: identity.into(),
            sink: Mutex::new(sink),
        })
    }

    /// Process-unique id; distinguishes a replaced slot from its successor.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Write one message. Concurrent callers queue on the write lock.
    pub async fn send(&self, payload: &str) -> Result<()> {
        let mut sink = self.sink.lock().await;
        sink.send_text(payload.to_owned()).await
    }

    pub async fn ping(&self) -> Result<()> {
        let mut sink = self.sink.lock().await;
        sink.send_ping().await
    }

    /// Best-effort close; the peer may already be gone.
    pub async fn close(&self) {
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.close().await {
            tracing::debug!(room = %self.room, user = %self.identity, error = %e, "close failed");
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("room", &self.room)
            .field("identity", &self.identity)
            .finish()
    }
}
