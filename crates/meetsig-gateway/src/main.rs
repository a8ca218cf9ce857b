//! meetsig signaling gateway.
//!
//! - WebSocket endpoint: /ws/p2p/{room}/{user}?token=...
//! - Admission checks before upgrade, in-memory room hub after
//! - Tracing span per session, ping + liveness deadline per peer

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use meetsig_gateway::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = config::resolve_path(std::env::args().nth(1));
    let cfg = config::load_from_file(&path).expect("config load failed");
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .expect("gateway.listen must be a valid SocketAddr");

    let state = app_state::AppState::new(cfg).expect("app state init failed");
    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "meetsig-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler failed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
