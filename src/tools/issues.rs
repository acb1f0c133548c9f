//! Issue-tracker tools (`jira_*`).

use crate::error::{BridgeError, BridgeResult};
use crate::models::{CreateIssueRequest, IssueDetails, IssueSummary, TransitionRequest, UpdateIssueRequest};
use crate::services::IssueTracker;
use crate::tools::format::{format_table, labeled_fields};
use crate::tools::registry::{ParameterSpec, ToolDescriptor, ToolRegistry, handler};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_RESULTS: u32 = 50;
pub const MAX_RESULTS_LIMIT: u32 = 100;

/// Register every issue tool against `tracker`.
pub fn register_issue_tools<T: IssueTracker>(
    registry: &mut ToolRegistry,
    tracker: Arc<T>,
) -> BridgeResult<()> {
    let t = tracker.clone();
    registry.register(
        ToolDescriptor::new("jira_get_issue", "Get a Jira issue by key").param(
            ParameterSpec::string(
                "issue_key",
                "The unique identifier of the Jira issue (e.g., KP-2, PROJ-123)",
            )
            .required(),
        ),
        handler(move |args, cancel| {
            let tracker = t.clone();
            async move {
                let key = args.require_str("issue_key")?;
                let issue = until_cancelled("get issue", &cancel, tracker.get_issue(key)).await?;
                Ok(render_issue(&issue))
            }
        }),
    )?;

    let t = tracker.clone();
    registry.register(
        ToolDescriptor::new("jira_search_issues", "Search Jira issues with JQL")
            .param(ParameterSpec::string("jql", "JQL query, e.g. project = KP AND status = Open").required())
            .param(ParameterSpec::number(
                "max_results",
                "Maximum number of issues to return (1-100, default 50)",
            )),
        handler(move |args, cancel| {
            let tracker = t.clone();
            async move {
                let jql = args.require_str("jql")?;
                let max_results = max_results(args.f64("max_results"))?;
                let issues =
                    until_cancelled("search issues", &cancel, tracker.search_issues(jql, max_results))
                        .await?;
                Ok(render_search(&issues))
            }
        }),
    )?;

    let t = tracker.clone();
    registry.register(
        ToolDescriptor::new("jira_create_issue", "Create a Jira issue")
            .param(ParameterSpec::string("project_key", "Project key, e.g. KP").required())
            .param(ParameterSpec::string("summary", "Issue summary").required())
            .param(ParameterSpec::string("issue_type", "Issue type, e.g. Task or Bug").required())
            .param(ParameterSpec::string("description", "Issue description")),
        handler(move |args, cancel| {
            let tracker = t.clone();
            async move {
                let request = CreateIssueRequest {
                    project_key: args.require_str("project_key")?.to_string(),
                    summary: args.require_str("summary")?.to_string(),
                    issue_type: args.require_str("issue_type")?.to_string(),
                    description: args.str("description").map(str::to_string),
                };
                let created =
                    until_cancelled("create issue", &cancel, tracker.create_issue(request)).await?;
                Ok(labeled_fields([
                    ("Created issue", created.key.as_str()),
                    ("ID", created.id.as_str()),
                    ("URL", created.url.as_str()),
                ]))
            }
        }),
    )?;

    let t = tracker.clone();
    registry.register(
        ToolDescriptor::new("jira_update_issue", "Update the summary or description of a Jira issue")
            .param(ParameterSpec::string("issue_key", "Issue key, e.g. KP-2").required())
            .param(ParameterSpec::string("summary", "New summary"))
            .param(ParameterSpec::string("description", "New description")),
        handler(move |args, cancel| {
            let tracker = t.clone();
            async move {
                let request = UpdateIssueRequest {
                    issue_key: args.require_str("issue_key")?.to_string(),
                    summary: args.str("summary").map(str::to_string),
                    description: args.str("description").map(str::to_string),
                };
                if request.is_empty() {
                    return Err(BridgeError::invalid_input(
                        "Provide at least one of 'summary' or 'description'",
                    ));
                }
                let key = request.issue_key.clone();
                until_cancelled("update issue", &cancel, tracker.update_issue(request)).await?;
                Ok(format!("Issue {} updated", key))
            }
        }),
    )?;

    let t = tracker.clone();
    registry.register(
        ToolDescriptor::new(
            "jira_transition_issue",
            "Move a Jira issue through its workflow (see jira_get_issue for available transitions)",
        )
        .param(ParameterSpec::string("issue_key", "Issue key, e.g. KP-2").required())
        .param(ParameterSpec::string("transition_id", "Transition ID").required())
        .param(ParameterSpec::string("comment", "Comment to add with the transition")),
        handler(move |args, cancel| {
            let tracker = t.clone();
            async move {
                let request = TransitionRequest {
                    issue_key: args.require_str("issue_key")?.to_string(),
                    transition_id: args.require_str("transition_id")?.to_string(),
                    comment: args.str("comment").map(str::to_string),
                };
                let message = format!(
                    "Issue {} transitioned with transition {}",
                    request.issue_key, request.transition_id
                );
                until_cancelled("transition issue", &cancel, tracker.transition_issue(request))
                    .await?;
                Ok(message)
            }
        }),
    )?;

    let t = tracker;
    registry.register(
        ToolDescriptor::new("jira_add_comment", "Add a comment to a Jira issue")
            .param(ParameterSpec::string("issue_key", "Issue key, e.g. KP-2").required())
            .param(ParameterSpec::string("body", "Comment text").required()),
        handler(move |args, cancel| {
            let tracker = t.clone();
            async move {
                let key = args.require_str("issue_key")?;
                let body = args.require_str("body")?;
                let comment =
                    until_cancelled("add comment", &cancel, tracker.add_comment(key, body)).await?;
                let mut text = format!("Comment {} added to {}", comment.id, key);
                if let Some(author) = comment.author {
                    text.push_str(&format!(" by {}", author));
                }
                Ok(text)
            }
        }),
    )?;

    Ok(())
}

/// Race an HTTP call against the caller's cancellation.
async fn until_cancelled<T>(
    operation: &str,
    cancel: &CancellationToken,
    work: impl Future<Output = BridgeResult<T>>,
) -> BridgeResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BridgeError::cancelled(operation)),
        result = work => result,
    }
}

fn max_results(raw: Option<f64>) -> BridgeResult<u32> {
    let Some(n) = raw else {
        return Ok(DEFAULT_MAX_RESULTS);
    };
    if n.fract() != 0.0 || n < 1.0 || n > MAX_RESULTS_LIMIT as f64 {
        return Err(BridgeError::invalid_input(format!(
            "Parameter 'max_results' must be a whole number between 1 and {}",
            MAX_RESULTS_LIMIT
        )));
    }
    Ok(n as u32)
}

fn or_none(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("None")
}

fn render_issue(issue: &IssueDetails) -> String {
    let mut text = labeled_fields([
        ("Issue", issue.key.as_str()),
        ("Summary", issue.summary.as_str()),
        ("Description", or_none(&issue.description)),
        ("Status", or_none(&issue.status)),
        ("Assignee", issue.assignee.as_deref().unwrap_or("Unassigned")),
        ("Priority", or_none(&issue.priority)),
        ("Created", or_none(&issue.created)),
        ("Updated", or_none(&issue.updated)),
    ]);

    if !issue.subtasks.is_empty() {
        text.push_str("\nSubtasks:\n");
        for sub in &issue.subtasks {
            text.push_str(&format!(
                "- {}: {} [{}]\n",
                sub.key,
                sub.summary,
                or_none(&sub.status)
            ));
        }
    }

    if !issue.transitions.is_empty() {
        text.push_str("\nAvailable transitions:\n");
        for t in &issue.transitions {
            text.push_str(&format!("- {}: {}\n", t.id, t.name));
        }
    }
    text
}

fn render_search(issues: &[IssueSummary]) -> String {
    let mut text = format!("Found {} issues:\n\n", issues.len());
    if issues.is_empty() {
        return text;
    }
    let rows: Vec<Vec<String>> = issues
        .iter()
        .map(|i| {
            vec![
                i.key.clone(),
                or_none(&i.status).to_string(),
                i.assignee.clone().unwrap_or_else(|| "Unassigned".into()),
                or_none(&i.priority).to_string(),
                i.summary.clone(),
            ]
        })
        .collect();
    text.push_str(&format_table(
        &["KEY", "STATUS", "ASSIGNEE", "PRIORITY", "SUMMARY"],
        &rows,
    ));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubtaskInfo, TransitionInfo};

    #[test]
    fn test_max_results_bounds() {
        assert_eq!(max_results(None).unwrap(), DEFAULT_MAX_RESULTS);
        assert_eq!(max_results(Some(10.0)).unwrap(), 10);
        assert!(max_results(Some(0.0)).is_err());
        assert!(max_results(Some(2.5)).is_err());
        assert!(max_results(Some(101.0)).is_err());
    }

    #[test]
    fn test_render_issue() {
        let issue = IssueDetails {
            key: "KP-2".into(),
            summary: "Broken login".into(),
            status: Some("Open".into()),
            subtasks: vec![SubtaskInfo {
                key: "KP-3".into(),
                summary: "Fix form".into(),
                status: None,
            }],
            transitions: vec![TransitionInfo {
                id: "31".into(),
                name: "Done".into(),
            }],
            ..Default::default()
        };
        let text = render_issue(&issue);
        assert!(text.starts_with("Issue: KP-2\nSummary: Broken login\n"));
        assert!(text.contains("Assignee: Unassigned\n"));
        assert!(text.contains("- KP-3: Fix form [None]"));
        assert!(text.contains("Available transitions:\n- 31: Done\n"));
    }

    #[test]
    fn test_render_search() {
        let text = render_search(&[IssueSummary {
            key: "KP-1".into(),
            summary: "First".into(),
            status: Some("Done".into()),
            ..Default::default()
        }]);
        assert!(text.starts_with("Found 1 issues:\n\n"));
        assert!(text.contains("KP-1"));
        assert!(text.contains("Unassigned"));
        assert_eq!(render_search(&[]), "Found 0 issues:\n\n");
    }

    #[tokio::test]
    async fn test_until_cancelled_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = until_cancelled("slow call", &cancel, async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(BridgeError::Cancelled { .. })));
    }
}
