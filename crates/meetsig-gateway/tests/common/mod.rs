//! Channel-backed sockets shared by the gateway integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, Stream};
use tokio::sync::{mpsc, Notify};

use meetsig_core::error::{Result, SignalError};
use meetsig_gateway::realtime::{Connection, FrameSink};
use meetsig_gateway::transport::codec::Frame;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    /// A gated write entered the sink (only `gated_peer` records this).
    Begin,
    Text(String),
    Ping,
    Close,
}

pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Sent>,
    broken: Arc<AtomicBool>,
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.push(Sent::Text(text))
    }

    async fn send_ping(&mut self) -> Result<()> {
        self.push(Sent::Ping)
    }

    async fn close(&mut self) -> Result<()> {
        self.tx
            .send(Sent::Close)
            .map_err(|_| SignalError::Transport("peer gone".into()))
    }
}

impl ChannelSink {
    fn push(&self, s: Sent) -> Result<()> {
        if self.broken.load(Ordering::Relaxed) {
            return Err(SignalError::Transport("broken pipe".into()));
        }
        self.tx
            .send(s)
            .map_err(|_| SignalError::Transport("peer gone".into()))
    }
}

/// What a peer's socket received.
pub struct Probe {
    rx: mpsc::UnboundedReceiver<Sent>,
    broken: Arc<AtomicBool>,
}

impl Probe {
    /// Make every subsequent write to this peer fail.
    pub fn break_pipe(&self) {
        self.broken.store(true, Ordering::Relaxed);
    }

    pub fn drain(&mut self) -> Vec<Sent> {
        let mut out = Vec::new();
        while let Ok(s) = self.rx.try_recv() {
            out.push(s);
        }
        out
    }

    /// Text frames received so far, parsed as JSON.
    pub fn envelopes(&mut self) -> Vec<serde_json::Value> {
        self.drain()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text(t) => Some(serde_json::from_str(&t).unwrap()),
                _ => None,
            })
            .collect()
    }

    /// Wait for the next text frame, skipping pings.
    pub async fn next_envelope(&mut self) -> serde_json::Value {
        loop {
            let sent = tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
                .await
                .expect("timed out waiting for envelope")
                .expect("sink dropped");
            if let Sent::Text(t) = sent {
                return serde_json::from_str(&t).unwrap();
            }
        }
    }

    pub async fn wait_closed(&mut self) {
        loop {
            let sent = tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
                .await
                .expect("timed out waiting for close");
            if matches!(sent, None | Some(Sent::Close)) {
                return;
            }
        }
    }
}

pub fn sink() -> (ChannelSink, Probe) {
    let (tx, rx) = mpsc::unbounded_channel();
    let broken = Arc::new(AtomicBool::new(false));
    (
        ChannelSink { tx, broken: Arc::clone(&broken) },
        Probe { rx, broken },
    )
}

pub fn peer(room: &str, user: &str) -> (Arc<Connection>, Probe) {
    let (s, probe) = sink();
    (Connection::new(room, user, s), probe)
}

pub type InboundStream = Pin<Box<dyn Stream<Item = Result<Frame>> + Send>>;

/// Feed side of a fake socket's read half. Dropping the sender ends the stream.
pub fn inbound() -> (mpsc::UnboundedSender<Result<Frame>>, InboundStream) {
    let (tx, rx) = mpsc::unbounded_channel::<Result<Frame>>();
    let s = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|f| (f, rx)) });
    (tx, Box::pin(s))
}

pub fn text(v: serde_json::Value) -> Result<Frame> {
    Ok(Frame::Text(v.to_string()))
}

/// Holds every text write inside the sink until the gate opens.
pub struct Gate {
    open: AtomicBool,
    notify: Notify,
}

impl Gate {
    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.open.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

pub struct GatedSink {
    inner: ChannelSink,
    gate: Arc<Gate>,
}

#[async_trait]
impl FrameSink for GatedSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.inner.push(Sent::Begin)?;
        self.gate.wait().await;
        self.inner.push(Sent::Text(text))
    }

    async fn send_ping(&mut self) -> Result<()> {
        self.inner.push(Sent::Ping)
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await
    }
}

/// A peer whose text writes stall mid-frame until `Gate::open`.
pub fn gated_peer(room: &str, user: &str) -> (Arc<Connection>, Probe, Arc<Gate>) {
    let (inner, probe) = sink();
    let gate = Arc::new(Gate { open: AtomicBool::new(false), notify: Notify::new() });
    let conn = Connection::new(room, user, GatedSink { inner, gate: Arc::clone(&gate) });
    (conn, probe, gate)
}

impl Probe {
    /// Wait until a gated write has entered the sink.
    pub async fn wait_begin(&mut self) {
        let sent = tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
            .await
            .expect("timed out waiting for write to start");
        assert_eq!(sent, Some(Sent::Begin));
    }
}
