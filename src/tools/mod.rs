//! MCP tools.
//!
//! - `registry`: tool descriptors, argument validation and dispatch
//! - `sql`: SQL query, statement and schema tools
//! - `issues`: Jira issue tools
//! - `sql_guard`: read-only enforcement for `sql_execute_query`
//! - `format`: text rendering of results

pub mod format;
pub mod issues;
pub mod registry;
pub mod sql;
pub mod sql_guard;

pub use issues::register_issue_tools;
pub use registry::{
    ParamKind, ParameterSpec, ToolArguments, ToolDescriptor, ToolHandler, ToolRegistry,
    ToolResult, handler,
};
pub use sql::register_sql_tools;
