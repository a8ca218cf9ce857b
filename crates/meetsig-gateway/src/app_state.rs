//! Shared application state for the signaling gateway.
//!
//! Wires the hub, handshake gate and event injector around one set of
//! collaborators. Startup errors are returned, never panicked.

use std::sync::Arc;

use meetsig_core::error::Result;

use crate::config::GatewayConfig;
use crate::directory::{IdentityVerifier, Membership, RoomDirectory, StaticDirectory};
use crate::obs::RelayMetrics;
use crate::policy::JoinWindow;
use crate::realtime::{EventInjector, Hub};
use crate::transport::handshake::HandshakeGate;
use crate::transport::session::SessionConfig;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    hub: Arc<Hub>,
    gate: Arc<HandshakeGate>,
    injector: Arc<EventInjector>,
    metrics: Arc<RelayMetrics>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    session: SessionConfig,
}

impl AppState {
    /// Build state backed by the config's static directory.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let directory = Arc::new(StaticDirectory::from_config(&cfg.directory));
        tracing::info!(rooms = directory.room_count(), "static directory loaded");
        Self::with_collaborators(cfg, directory.clone(), directory.clone(), directory)
    }

    /// Build state around externally provided collaborators.
    pub fn with_collaborators(
        cfg: GatewayConfig,
        identity: Arc<dyn IdentityVerifier>,
        rooms: Arc<dyn RoomDirectory>,
        members: Arc<dyn Membership>,
    ) -> Result<Self> {
        cfg.validate()?;

        let metrics = Arc::new(RelayMetrics::default());
        let hub = Arc::new(Hub::new(Arc::clone(&metrics)));
        let window = JoinWindow::from_secs(cfg.admission.early_join_secs);

        let gate = Arc::new(HandshakeGate::new(identity, Arc::clone(&rooms), members, window));
        let injector = Arc::new(EventInjector::new(Arc::clone(&hub), rooms, window));
        let session = SessionConfig::from_gateway(&cfg.gateway);

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, session }),
            hub,
            gate,
            injector,
            metrics,
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn session_config(&self) -> SessionConfig {
        self.inner.session
    }

    pub fn hub(&self) -> Arc<Hub> {
        Arc::clone(&self.hub)
    }

    pub fn gate(&self) -> Arc<HandshakeGate> {
        Arc::clone(&self.gate)
    }

    /// Entry point for in-process collaborators (CRUD layer, schedulers).
    pub fn injector(&self) -> Arc<EventInjector> {
        Arc::clone(&self.injector)
    }

    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Gauges computed from live hub state at scrape time.
    pub async fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![("meetsig_rooms_active", self.hub.room_count().await as u64)]
    }
}
