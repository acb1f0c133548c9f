//! HTTP transport with Streamable HTTP support for the MCP server.
//!
//! Besides the MCP endpoint the router serves `GET /ping` for liveness and
//! `GET /status` with the availability of each toolset. Every route answers
//! CORS preflight requests so browser-based MCP clients can connect.

use crate::bridge::{ToolBridge, ToolsetStatus};
use crate::error::{BridgeError, BridgeResult};
use crate::mcp::BridgeService;
use crate::transport::{Transport, wait_for_signal};
use axum::extract::State;
use axum::http::{Method, header};
use axum::routing::get;
use axum::{Json, Router};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Open SSE streams can keep the server alive; give up on them after this.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTransport {
    bridge: Arc<ToolBridge>,
    host: String,
    port: u16,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(
        bridge: Arc<ToolBridge>,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            bridge,
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn router(&self) -> Router {
        let bridge = self.bridge.clone();
        let service = StreamableHttpService::new(
            move || Ok(BridgeService::new(bridge.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        let app = Router::new()
            .route("/ping", get(ping))
            .route("/status", get(status))
            .with_state(self.bridge.clone());

        // nest_service does not accept the root path.
        let app = if self.endpoint == "/" {
            app.fallback_service(service)
        } else {
            app.nest_service(&self.endpoint, service)
        };
        app.layer(cors_layer())
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub tools: usize,
    pub toolsets: Vec<ToolsetStatus>,
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        message: "MCP server is running",
    })
}

async fn status(State(bridge): State<Arc<ToolBridge>>) -> Json<StatusResponse> {
    let toolsets = bridge.toolsets().to_vec();
    let degraded = toolsets.iter().any(|t| !t.available);
    Json(StatusResponse {
        status: if degraded { "degraded" } else { "ok" },
        version: env!("CARGO_PKG_VERSION"),
        tools: bridge.registry().len(),
        toolsets,
    })
}

impl Transport for HttpTransport {
    async fn run(&self) -> BridgeResult<()> {
        let bind_addr = self.bind_addr();
        let app = self.router();

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            BridgeError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available",
            )
        })?;

        info!(
            addr = %bind_addr,
            endpoint = %self.endpoint,
            tools = self.bridge.registry().len(),
            "MCP endpoint ready"
        );

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let notify = shutdown_notify.clone();
        let shutdown_signal = async move {
            wait_for_signal().await;
            notify.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!(error = %e, "HTTP server error");
                    return Err(BridgeError::internal(format!("HTTP server error: {}", e)));
                }
                info!("HTTP server stopped");
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)..."
                );
                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        self.bridge.shutdown().await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
