//! Axum router wiring.
//!
//! - `/ws/p2p/:room_identity/:user_identity?token=...` : signaling upgrade
//! - `/healthz`, `/metrics` : ops

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws/p2p/:room_identity/:user_identity", get(transport::ws::ws_upgrade))
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
