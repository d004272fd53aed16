//! HTTP surface for renderers
//!
//! Read-only: a health probe and a WebSocket that streams render snapshots
//! as they are published. The core never reads anything back from
//! presentation clients.

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::engine::Snapshot;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Snapshot server for presentation clients
pub struct ApiServer {
    port: u16,
    snapshot_rx: watch::Receiver<Snapshot>,
}

impl ApiServer {
    /// Create a server publishing the given snapshot stream
    #[must_use]
    pub const fn new(port: u16, snapshot_rx: watch::Receiver<Snapshot>) -> Self {
        Self { port, snapshot_rx }
    }

    /// Build the router
    fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(health))
            .route("/ws/snapshot", get(ws_upgrade))
            .with_state(self.snapshot_rx.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind snapshot server: {e}")))?;

        tracing::info!(port = self.port, "snapshot server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("snapshot server error: {e}")))?;

        Ok(())
    }

    /// Run the server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

/// Liveness probe
async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handle WebSocket upgrade request
async fn ws_upgrade(
    State(snapshot_rx): State<watch::Receiver<Snapshot>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_snapshots(socket, snapshot_rx))
}

/// Push snapshots to one presentation client until either side closes
async fn stream_snapshots(socket: WebSocket, mut snapshot_rx: watch::Receiver<Snapshot>) {
    let (mut sender, mut receiver) = socket.split();

    tracing::debug!("snapshot client connected");

    loop {
        tokio::select! {
            changed = snapshot_rx.changed() => {
                if changed.is_err() {
                    // Engine gone; nothing left to stream
                    break;
                }
                let json = {
                    let snapshot = snapshot_rx.borrow_and_update();
                    match serde_json::to_string(&*snapshot) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::warn!(error = %e, "snapshot serialization failed");
                            continue;
                        }
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Presentation clients have nothing to say; ignore
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!("snapshot client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let json = serde_json::to_string(&HealthResponse {
            status: "ok",
            version: "0.1.0",
        })
        .unwrap();
        assert!(json.contains("\"status\":\"ok\""));
    }
}
