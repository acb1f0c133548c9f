//! MCP Tool Bridge Library
//!
//! Exposes an issue tracker and a SQL database (SQLite, PostgreSQL, MySQL)
//! to MCP clients as a uniform set of schema-described tools.

pub mod bridge;
pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod services;
pub mod tools;
pub mod transport;

pub use bridge::ToolBridge;
pub use config::Config;
pub use error::{BridgeError, BridgeResult};
pub use mcp::BridgeService;
