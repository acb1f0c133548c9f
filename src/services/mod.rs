//! Clients for external services exposed as tools.

pub mod jira;

pub use jira::{IssueTracker, JiraClient};
