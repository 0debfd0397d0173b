//! HTTP transport server using Axum.
//!
//! Accepts connections, turns each call into an [`HttpRequest`], runs the
//! [`HttpAdapter`] on the blocking pool (handlers are synchronous and may
//! block) and writes the resulting [`HttpResponse`] back.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{any, get},
};
use bytes::Bytes;
use rpcgate_protocol::RpcError;
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::adapter::{HttpAdapter, HttpRequest, HttpResponse, RequestHandler};
use crate::checks::CheckChain;
use crate::cors::CorsPolicy;
use crate::error::TransportError;

const HEALTH_PATH: &str = "/health";

/// Transport server configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// URL path serving JSON-RPC calls
    pub path: String,
    /// Allowed CORS origins
    pub cors: CorsPolicy,
    /// Largest accepted request body, in bytes
    pub max_body_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 7070,
            hostname: "127.0.0.1".into(),
            path: "/".into(),
            cors: CorsPolicy::Disabled,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Shared state for the transport server.
struct AppState<H: RequestHandler> {
    adapter: Arc<HttpAdapter<H>>,
}

/// The transport server: owns the listener task.
pub struct TransportServer {
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound address
    local_addr: SocketAddr,
}

impl TransportServer {
    /// Start the transport server with the given request handler.
    pub async fn start<H: RequestHandler>(
        config: TransportConfig,
        handler: Arc<H>,
    ) -> Result<Self, TransportError> {
        Self::start_with_checks(config, handler, CheckChain::new()).await
    }

    /// Start the transport server with a chain of pre-dispatch checks.
    pub async fn start_with_checks<H: RequestHandler>(
        config: TransportConfig,
        handler: Arc<H>,
        checks: CheckChain,
    ) -> Result<Self, TransportError> {
        if !config.path.starts_with('/') || config.path == HEALTH_PATH {
            return Err(TransportError::InvalidPath(config.path));
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let adapter = HttpAdapter::new(handler)
            .with_cors(config.cors.clone())
            .with_checks(checks);
        let state = Arc::new(AppState {
            adapter: Arc::new(adapter),
        });

        let app = Router::new()
            .route(&config.path, any(rpc_handler::<H>))
            .route(HEALTH_PATH, get(health_handler::<H>))
            .layer(DefaultBodyLimit::max(config.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let addr = format!("{}:{}", config.hostname, config.port);
        let listener = tokio::net::TcpListener::bind((config.hostname.as_str(), config.port))
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        info!("JSON-RPC transport listening on http://{}{}", local_addr, config.path);

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await
            .ok();
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            local_addr,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Gracefully stop the server.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("JSON-RPC transport server stopped");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn rpc_handler<H: RequestHandler>(
    State(state): State<Arc<AppState<H>>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let request = HttpRequest {
        method,
        headers,
        remote_addr: Some(peer.ip()),
        body,
    };

    let adapter = state.adapter.clone();
    match tokio::task::spawn_blocking(move || adapter.handle(&request)).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            error!("Request task failed for {peer}: {e}");
            HttpResponse::rpc_error(StatusCode::INTERNAL_SERVER_ERROR, RpcError::server_error())
                .into_response()
        }
    }
}

async fn health_handler<H: RequestHandler>(
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "methods": state.adapter.handler().method_count(),
    }))
}
