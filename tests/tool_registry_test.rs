//! Integration tests for tool dispatch through the registry.
//!
//! The issue tools run against an in-memory tracker that counts calls, so
//! these tests also check that validation failures never reach a backend.

use mcp_tool_bridge::error::{BridgeError, BridgeResult};
use mcp_tool_bridge::models::{
    CreateIssueRequest, CreatedComment, CreatedIssue, IssueDetails, IssueSummary,
    TransitionInfo, TransitionRequest, UpdateIssueRequest,
};
use mcp_tool_bridge::services::IssueTracker;
use mcp_tool_bridge::tools::{
    ParameterSpec, ToolDescriptor, ToolRegistry, ToolResult, handler, register_issue_tools,
};
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct MockTracker {
    get_calls: AtomicUsize,
    search_calls: AtomicUsize,
    update_calls: AtomicUsize,
    last_max_results: AtomicUsize,
}

impl IssueTracker for MockTracker {
    async fn get_issue(&self, key: &str) -> BridgeResult<IssueDetails> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        match key {
            "KP-2" => Ok(IssueDetails {
                key: "KP-2".into(),
                summary: "Fix login".into(),
                status: Some("In Progress".into()),
                transitions: vec![TransitionInfo {
                    id: "31".into(),
                    name: "Done".into(),
                }],
                ..Default::default()
            }),
            "SLOW-1" => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(BridgeError::internal("slow issue finished"))
            }
            _ => Err(BridgeError::issue_tracker(
                Some(404),
                "Issue does not exist or you do not have permission to see it.",
            )),
        }
    }

    async fn search_issues(&self, _jql: &str, max_results: u32) -> BridgeResult<Vec<IssueSummary>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.last_max_results
            .store(max_results as usize, Ordering::SeqCst);
        Ok(vec![IssueSummary {
            key: "KP-1".into(),
            summary: "First".into(),
            status: Some("Open".into()),
            assignee: None,
            priority: Some("High".into()),
        }])
    }

    async fn create_issue(&self, request: CreateIssueRequest) -> BridgeResult<CreatedIssue> {
        Ok(CreatedIssue {
            key: format!("{}-9", request.project_key),
            id: "10009".into(),
            url: format!("https://example.atlassian.net/browse/{}-9", request.project_key),
        })
    }

    async fn update_issue(&self, _request: UpdateIssueRequest) -> BridgeResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn transition_issue(&self, _request: TransitionRequest) -> BridgeResult<()> {
        Ok(())
    }

    async fn add_comment(&self, _key: &str, _body: &str) -> BridgeResult<CreatedComment> {
        Ok(CreatedComment {
            id: "500".into(),
            author: Some("Dev".into()),
        })
    }
}

fn args(value: JsonValue) -> Option<JsonMap<String, JsonValue>> {
    match value {
        JsonValue::Object(map) => Some(map),
        _ => None,
    }
}

fn issue_registry() -> (ToolRegistry, Arc<MockTracker>) {
    let tracker = Arc::new(MockTracker::default());
    let mut registry = ToolRegistry::new();
    register_issue_tools(&mut registry, tracker.clone()).unwrap();
    (registry, tracker)
}

#[tokio::test]
async fn test_valid_call_reaches_backend_once() {
    let (registry, tracker) = issue_registry();
    let result = registry
        .invoke(
            "jira_get_issue",
            args(json!({ "issue_key": "KP-2" })),
            CancellationToken::new(),
        )
        .await;

    assert!(result.is_success(), "{:?}", result);
    assert!(result.text().contains("Fix login"));
    assert!(result.text().contains("Done"));
    assert_eq!(tracker.get_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_argument_never_reaches_backend() {
    let (registry, tracker) = issue_registry();
    for payload in [None, args(json!({})), args(json!({ "issue_key": null }))] {
        let result = registry
            .invoke("jira_get_issue", payload, CancellationToken::new())
            .await;
        assert!(!result.is_success());
        assert!(result.text().contains("issue_key"));
    }
    assert_eq!(tracker.get_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_wrong_argument_kind_is_rejected() {
    let (registry, tracker) = issue_registry();
    let result = registry
        .invoke(
            "jira_get_issue",
            args(json!({ "issue_key": 42 })),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(
        result,
        ToolResult::Failure {
            message: "Invalid input: Parameter 'issue_key' must be a string".into()
        }
    );
    assert_eq!(tracker.get_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_tool() {
    let (registry, _) = issue_registry();
    let result = registry
        .invoke("jira_delete_everything", None, CancellationToken::new())
        .await;
    assert!(!result.is_success());
    assert!(result.text().contains("Unknown tool"));
    assert!(result.text().contains("jira_delete_everything"));
}

#[tokio::test]
async fn test_backend_failure_becomes_failure_result() {
    let (registry, tracker) = issue_registry();
    let result = registry
        .invoke(
            "jira_get_issue",
            args(json!({ "issue_key": "NOPE-1" })),
            CancellationToken::new(),
        )
        .await;

    assert!(!result.is_success());
    assert!(result.text().contains("HTTP 404"));
    assert_eq!(tracker.get_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_search_defaults_and_bounds() {
    let (registry, tracker) = issue_registry();
    let none = CancellationToken::new;

    let result = registry
        .invoke("jira_search_issues", args(json!({ "jql": "project = KP" })), none())
        .await;
    assert!(result.is_success());
    assert!(result.text().starts_with("Found 1 issues:"));
    assert_eq!(tracker.last_max_results.load(Ordering::SeqCst), 50);

    let result = registry
        .invoke(
            "jira_search_issues",
            args(json!({ "jql": "project = KP", "max_results": 500 })),
            none(),
        )
        .await;
    assert!(!result.is_success());
    assert_eq!(tracker.search_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_update_needs_a_field() {
    let (registry, tracker) = issue_registry();
    let result = registry
        .invoke(
            "jira_update_issue",
            args(json!({ "issue_key": "KP-2" })),
            CancellationToken::new(),
        )
        .await;
    assert!(!result.is_success());
    assert_eq!(tracker.update_calls.load(Ordering::SeqCst), 0);

    let result = registry
        .invoke(
            "jira_update_issue",
            args(json!({ "issue_key": "KP-2", "summary": "Renamed" })),
            CancellationToken::new(),
        )
        .await;
    assert!(result.is_success(), "{:?}", result);
    assert_eq!(tracker.update_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_call_returns_failure() {
    let (registry, _) = issue_registry();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        registry.invoke("jira_get_issue", args(json!({ "issue_key": "SLOW-1" })), cancel),
    )
    .await
    .expect("cancellation should end the call");

    assert!(!result.is_success());
    assert!(result.text().contains("cancelled"));
}

#[tokio::test]
async fn test_duplicate_registration_keeps_first_handler() {
    let mut registry = ToolRegistry::new();
    registry
        .register(
            ToolDescriptor::new("echo", "Echo")
                .param(ParameterSpec::string("text", "Text").required()),
            handler(|args, _| async move { Ok(format!("first: {}", args.require_str("text")?)) }),
        )
        .unwrap();

    let err = registry
        .register(
            ToolDescriptor::new("echo", "Echo again"),
            handler(|_, _| async { Ok("second".to_string()) }),
        )
        .unwrap_err();
    assert!(matches!(err, BridgeError::DuplicateTool { ref name } if name == "echo"));

    assert_eq!(registry.len(), 1);
    let result = registry
        .invoke("echo", args(json!({ "text": "hi" })), CancellationToken::new())
        .await;
    assert_eq!(result.text(), "first: hi");
}

#[tokio::test]
async fn test_issue_tools_cannot_register_twice() {
    let (mut registry, tracker) = issue_registry();
    let before = registry.len();
    assert!(register_issue_tools(&mut registry, tracker).is_err());
    assert_eq!(registry.len(), before);
}

#[test]
fn test_descriptors_keep_registration_order() {
    let (registry, _) = issue_registry();
    let names: Vec<&str> = registry.descriptors().map(|d| d.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "jira_get_issue",
            "jira_search_issues",
            "jira_create_issue",
            "jira_update_issue",
            "jira_transition_issue",
            "jira_add_comment",
        ]
    );

    let schema = registry.descriptor("jira_create_issue").unwrap().input_schema();
    assert_eq!(
        schema["required"],
        json!(["project_key", "summary", "issue_type"])
    );
}
