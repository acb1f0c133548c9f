//! MCP protocol surface.

pub mod service;

pub use service::BridgeService;
