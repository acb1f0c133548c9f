//! Data models for the tool bridge.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod issue;
pub mod query;
pub mod record;
pub mod schema;

// Re-export commonly used types
pub use connection::DatabaseType;
pub use issue::{
    CreateIssueRequest, CreatedComment, CreatedIssue, IssueDetails, IssueSummary, SubtaskInfo,
    TransitionInfo, TransitionRequest, UpdateIssueRequest,
};
pub use query::{QueryParam, parse_params};
pub use record::{ColumnValue, ExecuteOutcome, Record, ResultSet};
pub use schema::{ColumnSchema, DatabaseSchema, TableSchema};
