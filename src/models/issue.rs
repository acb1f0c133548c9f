//! Issue-tracker models.
//!
//! Tracker-neutral shapes; the wire format of a particular tracker is handled
//! by its client in `services`.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueDetails {
    pub key: String,
    pub summary: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub subtasks: Vec<SubtaskInfo>,
    pub transitions: Vec<TransitionInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueSummary {
    pub key: String,
    pub summary: String,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtaskInfo {
    pub key: String,
    pub summary: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIssueRequest {
    pub project_key: String,
    pub summary: String,
    pub issue_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedIssue {
    pub key: String,
    pub id: String,
    /// Browse URL for humans, not the REST self link.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateIssueRequest {
    pub issue_key: String,
    pub summary: Option<String>,
    pub description: Option<String>,
}

impl UpdateIssueRequest {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRequest {
    pub issue_key: String,
    pub transition_id: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedComment {
    pub id: String,
    pub author: Option<String>,
}
