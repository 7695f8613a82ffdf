//! HTTP pull endpoints and the WebSocket push feed for `badgewatch serve`.
//!
//! Every WebSocket session owns its own snapshot feed. A session ends when
//! a send fails, the client closes, or the monitor shuts down; none of
//! those affect other sessions or the ingestion side.

use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use futures_util::StreamExt;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use badgewatch_core::{DeviceView, IngestCounters, Monitor, snapshot_feed};

/// Shared handler state.
#[derive(Clone)]
pub struct WebState {
    monitor: Monitor,
    push_interval: Duration,
}

impl WebState {
    pub fn new(monitor: Monitor, push_interval: Duration) -> Self {
        Self {
            monitor,
            push_interval,
        }
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    devices: usize,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/devices", get(devices))
        .route("/api/devices/:address", get(device))
        .route("/api/stats", get(stats))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Serve until the monitor's cancellation token fires.
pub async fn serve(listener: TcpListener, state: WebState) -> std::io::Result<()> {
    let stop = state.monitor.cancellation_token().cancelled_owned();
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "web server listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(stop)
        .await
}

// ── Pull ─────────────────────────────────────────────────────────────

async fn health(State(state): State<WebState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        devices: state.monitor.all_records().len(),
    })
}

async fn devices(State(state): State<WebState>) -> Json<Vec<DeviceView>> {
    Json(state.monitor.snapshot())
}

async fn device(
    State(state): State<WebState>,
    Path(address): Path<String>,
) -> Result<Json<DeviceView>, StatusCode> {
    state.monitor.device(&address).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn stats(State(state): State<WebState>) -> Json<IngestCounters> {
    Json(state.monitor.stats())
}

// ── Push ─────────────────────────────────────────────────────────────

async fn ws_handler(State(state): State<WebState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| push_snapshots(socket, state))
}

async fn push_snapshots(mut socket: WebSocket, state: WebState) {
    debug!("push client connected");
    let mut feed = std::pin::pin!(snapshot_feed(state.monitor, state.push_interval));

    loop {
        tokio::select! {
            snap = feed.next() => {
                let Some(snap) = snap else {
                    debug!("snapshot feed ended");
                    break;
                };
                let text = match serde_json::to_string(&snap) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "failed to encode snapshot");
                        break;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    debug!("push client went away");
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                // No client-to-server protocol; anything else is ignored.
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("push session closed");
}
