//! Jira REST client.
//!
//! Talks to the v2 REST API with basic auth (account email + API token).
//! Issue keys always enter the URL as escaped path segments.

use crate::config::JiraConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::models::{
    CreateIssueRequest, CreatedComment, CreatedIssue, IssueDetails, IssueSummary, SubtaskInfo,
    TransitionInfo, TransitionRequest, UpdateIssueRequest,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use std::collections::BTreeMap;
use std::future::Future;
use tracing::debug;
use url::Url;

/// Fields requested for search results.
const SEARCH_FIELDS: [&str; 4] = ["summary", "status", "assignee", "priority"];

/// Operations the issue tools need from a tracker.
pub trait IssueTracker: Send + Sync + 'static {
    fn get_issue(&self, key: &str) -> impl Future<Output = BridgeResult<IssueDetails>> + Send;

    fn search_issues(
        &self,
        jql: &str,
        max_results: u32,
    ) -> impl Future<Output = BridgeResult<Vec<IssueSummary>>> + Send;

    fn create_issue(
        &self,
        request: CreateIssueRequest,
    ) -> impl Future<Output = BridgeResult<CreatedIssue>> + Send;

    fn update_issue(
        &self,
        request: UpdateIssueRequest,
    ) -> impl Future<Output = BridgeResult<()>> + Send;

    fn transition_issue(
        &self,
        request: TransitionRequest,
    ) -> impl Future<Output = BridgeResult<()>> + Send;

    fn add_comment(
        &self,
        key: &str,
        body: &str,
    ) -> impl Future<Output = BridgeResult<CreatedComment>> + Send;
}

#[derive(Debug, Clone)]
pub struct JiraClient {
    http: Client,
    base_url: Url,
    email: String,
    api_token: String,
}

impl JiraClient {
    pub fn new(config: &JiraConfig) -> BridgeResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("mcp-tool-bridge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            email: config.email.clone(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/rest/api/2/{segments...}`, each segment escaped.
    fn api_url(&self, segments: &[&str]) -> BridgeResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BridgeError::internal("Jira base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(["rest", "api", "2"])
            .extend(segments);
        Ok(url)
    }

    fn browse_url(&self, key: &str) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["browse", key]);
        }
        url.into()
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.email, Some(&self.api_token))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> BridgeResult<T> {
        let response = checked(self.authorized(request).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> BridgeResult<()> {
        checked(self.authorized(request).send().await?).await?;
        Ok(())
    }
}

impl IssueTracker for JiraClient {
    async fn get_issue(&self, key: &str) -> BridgeResult<IssueDetails> {
        let mut url = self.api_url(&["issue", key])?;
        url.query_pairs_mut().append_pair("expand", "transitions");
        debug!(issue = %key, "Fetching issue");

        let issue: WireIssue = self.send_json(self.http.get(url)).await?;
        Ok(issue.into_details())
    }

    async fn search_issues(&self, jql: &str, max_results: u32) -> BridgeResult<Vec<IssueSummary>> {
        let url = self.api_url(&["search", "jql"])?;
        let body = json!({
            "jql": jql,
            "maxResults": max_results,
            "fields": SEARCH_FIELDS,
        });
        debug!(max_results, "Searching issues");

        let page: WireSearchPage = self.send_json(self.http.post(url).json(&body)).await?;
        Ok(page.issues.into_iter().map(WireIssue::into_summary).collect())
    }

    async fn create_issue(&self, request: CreateIssueRequest) -> BridgeResult<CreatedIssue> {
        debug!(project = %request.project_key, "Creating issue");
        let url = self.api_url(&["issue"])?;
        let mut fields = JsonMap::new();
        fields.insert("project".into(), json!({ "key": request.project_key }));
        fields.insert("summary".into(), json!(request.summary));
        fields.insert("issuetype".into(), json!({ "name": request.issue_type }));
        if let Some(description) = request.description {
            fields.insert("description".into(), json!(description));
        }

        let created: WireCreated = self
            .send_json(self.http.post(url).json(&json!({ "fields": fields })))
            .await?;
        Ok(CreatedIssue {
            url: self.browse_url(&created.key),
            key: created.key,
            id: created.id,
        })
    }

    async fn update_issue(&self, request: UpdateIssueRequest) -> BridgeResult<()> {
        if request.is_empty() {
            return Err(BridgeError::invalid_input(
                "Nothing to update: provide summary and/or description",
            ));
        }
        debug!(issue = %request.issue_key, "Updating issue");
        let url = self.api_url(&["issue", request.issue_key.as_str()])?;
        let mut fields = JsonMap::new();
        if let Some(summary) = request.summary {
            fields.insert("summary".into(), json!(summary));
        }
        if let Some(description) = request.description {
            fields.insert("description".into(), json!(description));
        }

        self.send_empty(self.http.put(url).json(&json!({ "fields": fields })))
            .await
    }

    async fn transition_issue(&self, request: TransitionRequest) -> BridgeResult<()> {
        debug!(issue = %request.issue_key, transition = %request.transition_id, "Transitioning issue");
        let url = self.api_url(&["issue", request.issue_key.as_str(), "transitions"])?;
        let mut body = json!({ "transition": { "id": request.transition_id } });
        if let Some(comment) = request.comment {
            body["update"] = json!({ "comment": [{ "add": { "body": comment } }] });
        }

        self.send_empty(self.http.post(url).json(&body)).await
    }

    async fn add_comment(&self, key: &str, body: &str) -> BridgeResult<CreatedComment> {
        let url = self.api_url(&["issue", key, "comment"])?;
        debug!(issue = %key, "Adding comment");

        let comment: WireComment = self
            .send_json(self.http.post(url).json(&json!({ "body": body })))
            .await?;
        Ok(CreatedComment {
            id: comment.id,
            author: comment.author.and_then(WireUser::into_name),
        })
    }
}

/// Pass successful responses through; turn anything else into an error that
/// carries Jira's own messages.
async fn checked(response: Response) -> BridgeResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
    Err(BridgeError::issue_tracker(Some(status.as_u16()), message))
}

fn error_message(body: &str) -> Option<String> {
    let parsed: WireErrors = serde_json::from_str(body).ok()?;
    let mut messages = parsed.error_messages;
    messages.extend(
        parsed
            .errors
            .into_iter()
            .map(|(field, msg)| format!("{}: {}", field, msg)),
    );
    (!messages.is_empty()).then(|| messages.join("; "))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireErrors {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct WireSearchPage {
    #[serde(default)]
    issues: Vec<WireIssue>,
}

#[derive(Debug, Deserialize)]
struct WireIssue {
    key: String,
    #[serde(default)]
    fields: WireFields,
    #[serde(default)]
    transitions: Vec<WireTransition>,
}

#[derive(Debug, Default, Deserialize)]
struct WireFields {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<JsonValue>,
    #[serde(default)]
    status: Option<WireNamed>,
    #[serde(default)]
    assignee: Option<WireUser>,
    #[serde(default)]
    priority: Option<WireNamed>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    updated: Option<String>,
    #[serde(default)]
    subtasks: Vec<WireIssue>,
}

#[derive(Debug, Deserialize)]
struct WireNamed {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email_address: Option<String>,
}

impl WireUser {
    fn into_name(self) -> Option<String> {
        self.display_name.or(self.name).or(self.email_address)
    }
}

#[derive(Debug, Deserialize)]
struct WireTransition {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireCreated {
    id: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct WireComment {
    id: String,
    #[serde(default)]
    author: Option<WireUser>,
}

impl WireIssue {
    fn into_summary(self) -> IssueSummary {
        let f = self.fields;
        IssueSummary {
            key: self.key,
            summary: f.summary.unwrap_or_default(),
            status: f.status.map(|s| s.name),
            assignee: f.assignee.and_then(WireUser::into_name),
            priority: f.priority.map(|p| p.name),
        }
    }

    fn into_details(self) -> IssueDetails {
        let f = self.fields;
        IssueDetails {
            key: self.key,
            summary: f.summary.unwrap_or_default(),
            description: f.description.and_then(description_text),
            status: f.status.map(|s| s.name),
            assignee: f.assignee.and_then(WireUser::into_name),
            priority: f.priority.map(|p| p.name),
            created: f.created,
            updated: f.updated,
            subtasks: f
                .subtasks
                .into_iter()
                .map(|sub| SubtaskInfo {
                    key: sub.key,
                    summary: sub.fields.summary.unwrap_or_default(),
                    status: sub.fields.status.map(|s| s.name),
                })
                .collect(),
            transitions: self
                .transitions
                .into_iter()
                .map(|t| TransitionInfo {
                    id: t.id,
                    name: t.name,
                })
                .collect(),
        }
    }
}

/// v2 sends plain text; some sites still return a rich-text document.
fn description_text(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s),
        other => {
            let mut out = String::new();
            collect_text(&other, &mut out);
            Some(out.trim().to_string()).filter(|s| !s.is_empty())
        }
    }
}

fn collect_text(node: &JsonValue, out: &mut String) {
    if let Some(text) = node.get("text").and_then(JsonValue::as_str) {
        out.push_str(text);
    }
    if let Some(children) = node.get("content").and_then(JsonValue::as_array) {
        for child in children {
            collect_text(child, out);
        }
        if node.get("type").and_then(JsonValue::as_str) == Some("paragraph") {
            out.push('\n');
        }
    }
}
