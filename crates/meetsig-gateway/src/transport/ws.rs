//! WebSocket handler.
//!
//! Responsibilities:
//! - Run the handshake gate on the plain HTTP request
//! - Upgrade HTTP -> WS only for admitted callers
//! - Register the peer with the hub, then hand the read half to the
//!   session loop until the socket goes away

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, Path, Query, State},
    response::{IntoResponse, Response},
};
use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{info, warn, Instrument};

use meetsig_core::error::{Result, SignalError};

use crate::app_state::AppState;
use crate::realtime::{Connection, FrameSink};
use crate::transport::codec::Frame;
use crate::transport::handshake::{Admission, Rejection};
use crate::transport::session;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Write half of an axum WebSocket.
pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
}

impl WsSink {
    pub fn new(inner: SplitSink<WebSocket, Message>) -> Self {
        Self { inner }
    }
}

fn transport_err(e: axum::Error) -> SignalError {
    SignalError::Transport(e.to_string())
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.inner.send(Message::Text(text)).await.map_err(transport_err)
    }

    async fn send_ping(&mut self) -> Result<()> {
        self.inner.send(Message::Ping(Vec::new())).await.map_err(transport_err)
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await.map_err(transport_err)
    }
}

// --------------------
// Entry
// --------------------
pub async fn ws_upgrade(
    State(app): State<AppState>,
    Path((room_identity, user_identity)): Path<(String, String)>,
    Query(q): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let admission = match app
        .gate()
        .admit(&room_identity, &user_identity, q.token.as_deref(), Utc::now())
        .await
    {
        Ok(a) => a,
        Err(e) => {
            app.metrics()
                .handshake_rejections
                .inc(&[("reason", e.detail().unwrap_or(e.client_code().as_str()))]);
            warn!(room = %room_identity, user = %user_identity, error = %e, "handshake rejected");
            return Rejection(e).into_response();
        }
    };

    app.metrics().ws_upgrades.inc(&[]);
    let limit = app.cfg().gateway.transport_limit_bytes;
    let span = tracing::info_span!(
        "signal",
        room = %admission.room_identity,
        user = %admission.user_identity
    );

    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| run_socket(app, admission, socket).instrument(span))
}

// --------------------
// Session
// --------------------
async fn run_socket(app: AppState, admission: Admission, socket: WebSocket) {
    let (ws_tx, ws_rx) = socket.split();
    let conn = Connection::new(
        admission.room_identity,
        admission.user_identity,
        WsSink::new(ws_tx),
    );

    let hub = app.hub();
    if hub.admit(&conn).await.is_err() {
        return;
    }

    let inbound = ws_rx.map(|r| r.map(Frame::from).map_err(transport_err));
    let exit = session::run(hub, conn, inbound, app.session_config()).await;
    info!(?exit, "signaling session ended");
}
