//! Composition root.
//!
//! Builds one backend per configured toolset, registers its tools and records
//! whether it came up. A backend that cannot be reached is logged and skipped;
//! a tool name registered twice aborts start-up.

use crate::config::{Config, DatabaseConfig, JiraConfig, ToolsetKind};
use crate::db::{DbConnection, QueryExecutor};
use crate::error::BridgeResult;
use crate::services::{IssueTracker, JiraClient};
use crate::tools::{ToolRegistry, register_issue_tools, register_sql_tools};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of setting up one toolset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolsetStatus {
    pub name: String,
    pub available: bool,
    pub tools: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Registry plus the backends its handlers close over.
#[derive(Debug, Default)]
pub struct ToolBridge {
    registry: ToolRegistry,
    toolsets: Vec<ToolsetStatus>,
    connections: Vec<Arc<DbConnection>>,
}

impl ToolBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set up every toolset named in `config`.
    pub async fn from_config(config: &Config) -> BridgeResult<Self> {
        let mut bridge = Self::new();
        let toolsets = config.toolsets();
        if toolsets.is_empty() {
            warn!("No toolsets configured; set CONFIG_TOOLS (e.g. jira,sql-server)");
        }

        for kind in toolsets {
            match kind {
                ToolsetKind::SqlServer => bridge.setup_sql(config).await?,
                ToolsetKind::Jira => bridge.setup_jira(config)?,
            }
        }

        info!(
            tools = bridge.registry.len(),
            available = bridge.toolsets.iter().filter(|t| t.available).count(),
            unavailable = bridge.toolsets.iter().filter(|t| !t.available).count(),
            "Tool bridge ready"
        );
        Ok(bridge)
    }

    async fn setup_sql(&mut self, config: &Config) -> BridgeResult<()> {
        let db_config = match DatabaseConfig::from_config(config) {
            Ok(c) => c,
            Err(e) => {
                self.mark_unavailable(ToolsetKind::SqlServer, e);
                return Ok(());
            }
        };

        match DbConnection::connect(&db_config).await {
            Ok(connection) => {
                info!(
                    db_type = %connection.db_type(),
                    server_version = connection.server_version().unwrap_or("unknown"),
                    writable = connection.is_writable(),
                    "Database connected"
                );
                let connection = Arc::new(connection);
                let executor = QueryExecutor::new(connection.clone(), db_config.query_timeout);
                self.add_sql(executor)?;
                self.connections.push(connection);
                Ok(())
            }
            Err(e) => {
                self.mark_unavailable(ToolsetKind::SqlServer, e.user_message());
                Ok(())
            }
        }
    }

    fn setup_jira(&mut self, config: &Config) -> BridgeResult<()> {
        let client = JiraConfig::from_config(config)
            .and_then(|c| JiraClient::new(&c).map_err(|e| e.to_string()));

        match client {
            Ok(client) => {
                info!(base_url = %client.base_url(), "Jira client configured");
                self.add_issue_tracker(Arc::new(client))
            }
            Err(e) => {
                self.mark_unavailable(ToolsetKind::Jira, e);
                Ok(())
            }
        }
    }

    /// Register the SQL tools over an open executor.
    pub fn add_sql(&mut self, executor: QueryExecutor) -> BridgeResult<()> {
        let before = self.registry.len();
        register_sql_tools(&mut self.registry, executor)?;
        self.mark_available(ToolsetKind::SqlServer, before);
        Ok(())
    }

    /// Register the issue tools over `tracker`.
    pub fn add_issue_tracker<T: IssueTracker>(&mut self, tracker: Arc<T>) -> BridgeResult<()> {
        let before = self.registry.len();
        register_issue_tools(&mut self.registry, tracker)?;
        self.mark_available(ToolsetKind::Jira, before);
        Ok(())
    }

    fn mark_available(&mut self, kind: ToolsetKind, first_tool: usize) {
        let tools: Vec<String> = self
            .registry
            .descriptors()
            .skip(first_tool)
            .map(|d| d.name.clone())
            .collect();
        info!(toolset = %kind, tools = tools.len(), "Toolset registered");
        self.toolsets.push(ToolsetStatus {
            name: kind.name().to_string(),
            available: true,
            tools,
            error: None,
        });
    }

    /// Record a toolset that could not be set up. Its tools stay unregistered.
    pub fn mark_unavailable(&mut self, kind: ToolsetKind, reason: impl Into<String>) {
        let reason = reason.into();
        error!(toolset = %kind, error = %reason, "Toolset unavailable, skipping");
        self.toolsets.push(ToolsetStatus {
            name: kind.name().to_string(),
            available: false,
            tools: Vec::new(),
            error: Some(reason),
        });
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// For registering extra tools before the bridge is shared.
    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.registry
    }

    pub fn toolsets(&self) -> &[ToolsetStatus] {
        &self.toolsets
    }

    /// Close every database connection.
    pub async fn shutdown(&self) {
        for connection in &self.connections {
            connection.close().await;
        }
    }
}
