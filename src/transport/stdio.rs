//! Stdio transport for the MCP server.
//!
//! JSON-RPC is read from stdin and written to stdout, so nothing else may
//! write to stdout while this transport runs (logs go to stderr).

use crate::bridge::ToolBridge;
use crate::error::{BridgeError, BridgeResult};
use crate::mcp::BridgeService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

pub struct StdioTransport {
    bridge: Arc<ToolBridge>,
}

impl StdioTransport {
    pub fn new(bridge: Arc<ToolBridge>) -> Self {
        Self { bridge }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> BridgeResult<()> {
        info!(
            tools = self.bridge.registry().len(),
            "Starting MCP server with stdio transport"
        );

        let service = BridgeService::new(self.bridge.clone());
        let running_service = service.serve(stdio()).await.map_err(|e| {
            BridgeError::internal(format!("Failed to start stdio transport: {}", e))
        })?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                if let Err(e) = result {
                    warn!(error = %e, "Stdio transport error");
                    return Err(BridgeError::internal(format!("Stdio transport error: {}", e)));
                }
                info!("Stdio transport completed normally");
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        self.bridge.shutdown().await;

        if shutdown_requested {
            // A blocked stdin read cannot be interrupted.
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}
