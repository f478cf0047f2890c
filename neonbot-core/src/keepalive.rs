//! Tiny HTTP endpoint so hosting platforms can tell the bot is alive.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{Json, Router, extract::State, routing::get};
use axum_server::{Handle, Server};
use serde::Serialize;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::karaoke::SessionRegistry;

pub const ALIVE_BODY: &str = "OK - bot is alive";

#[derive(Clone)]
struct KeepaliveState {
    registry: SessionRegistry,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    sessions: usize,
}

pub fn router(registry: SessionRegistry) -> Router {
    Router::new()
        .route("/", get(alive))
        .route("/health", get(health))
        .with_state(KeepaliveState { registry })
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

async fn alive() -> &'static str {
    ALIVE_BODY
}

async fn health(State(state): State<KeepaliveState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        sessions: state.registry.live_count(),
    })
}

/// A running keepalive server; dropping it leaves the server running.
pub struct KeepaliveServer {
    handle: Handle,
    task: JoinHandle<()>,
}

impl KeepaliveServer {
    pub async fn stop(self) {
        self.handle.graceful_shutdown(Some(Duration::from_secs(2)));
        if let Err(e) = self.task.await {
            error!("Keepalive server task failed: {}", e);
        }
    }
}

pub fn start_keepalive_server(port: u16, registry: SessionRegistry) -> KeepaliveServer {
    let app = router(registry);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Keepalive server listening on http://{}", addr);

    let handle = Handle::new();
    let server = Server::bind(addr)
        .handle(handle.clone())
        .serve(app.into_make_service());

    let task = tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Keepalive server error: {}", e);
        }
        info!("Keepalive server shut down.");
    });

    KeepaliveServer { handle, task }
}
