//! Tool registry: named, schema-described operations bound to handlers.
//!
//! Every tool declares its parameters up front. [`ToolRegistry::invoke`]
//! checks the incoming argument payload against that declaration before the
//! handler runs, so handlers can read their arguments without re-validating
//! presence or kind.

use crate::error::{BridgeError, BridgeResult};
use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// JSON kind a parameter must have when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Boolean,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }

    fn accepts(&self, value: &JsonValue) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Number, description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Boolean, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Name, description and ordered parameters of one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    /// JSON Schema object for the argument payload.
    pub fn input_schema(&self) -> JsonMap<String, JsonValue> {
        let mut properties = JsonMap::new();
        for p in &self.parameters {
            properties.insert(
                p.name.clone(),
                json!({ "type": p.kind.as_str(), "description": p.description }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        let mut schema = JsonMap::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), JsonValue::Object(properties));
        schema.insert("required".into(), json!(required));
        schema
    }

    /// Check `arguments` against the declared parameters.
    ///
    /// Present (non-null) arguments must have the declared kind and every
    /// required parameter must be present. Undeclared arguments are dropped.
    pub fn validate(&self, arguments: Option<JsonMap<String, JsonValue>>) -> BridgeResult<ToolArguments> {
        let mut arguments = arguments.unwrap_or_default();
        let mut accepted = JsonMap::new();

        for spec in &self.parameters {
            match arguments.remove(&spec.name) {
                Some(JsonValue::Null) | None => {
                    if spec.required {
                        return Err(BridgeError::invalid_input(format!(
                            "Missing required parameter '{}'",
                            spec.name
                        )));
                    }
                }
                Some(value) => {
                    if !spec.kind.accepts(&value) {
                        return Err(BridgeError::invalid_input(format!(
                            "Parameter '{}' must be a {}",
                            spec.name,
                            spec.kind.as_str()
                        )));
                    }
                    accepted.insert(spec.name.clone(), value);
                }
            }
        }

        if !arguments.is_empty() {
            debug!(
                tool = %self.name,
                ignored = ?arguments.keys().collect::<Vec<_>>(),
                "Ignoring undeclared arguments"
            );
        }

        Ok(ToolArguments(accepted))
    }
}

/// Arguments that passed validation against a [`ToolDescriptor`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments(JsonMap<String, JsonValue>);

impl ToolArguments {
    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(JsonValue::as_str)
    }

    /// A required string parameter.
    pub fn require_str(&self, name: &str) -> BridgeResult<&str> {
        self.str(name).ok_or_else(|| {
            BridgeError::invalid_input(format!("Missing required parameter '{}'", name))
        })
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(JsonValue::as_f64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(JsonValue::as_bool)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}

impl From<JsonMap<String, JsonValue>> for ToolArguments {
    fn from(map: JsonMap<String, JsonValue>) -> Self {
        Self(map)
    }
}

/// Uniform outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    Success { text: String },
    Failure { message: String },
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    /// The success text or the failure message.
    pub fn text(&self) -> &str {
        match self {
            ToolResult::Success { text } => text,
            ToolResult::Failure { message } => message,
        }
    }
}

pub type ToolHandler = Arc<
    dyn Fn(ToolArguments, CancellationToken) -> BoxFuture<'static, BridgeResult<String>>
        + Send
        + Sync,
>;

/// Box an async closure as a [`ToolHandler`].
pub fn handler<F, Fut>(f: F) -> ToolHandler
where
    F: Fn(ToolArguments, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = BridgeResult<String>> + Send + 'static,
{
    Arc::new(move |args, cancel| Box::pin(f(args, cancel)))
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: ToolHandler,
}

/// Name → tool map, fixed once composition is done.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` under the descriptor's name. A name can only be
    /// registered once; the first registration is kept.
    pub fn register(&mut self, descriptor: ToolDescriptor, handler: ToolHandler) -> BridgeResult<()> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(BridgeError::duplicate_tool(&descriptor.name));
        }
        debug!(tool = %descriptor.name, "Registered tool");
        self.tools.insert(
            descriptor.name.clone(),
            RegisteredTool {
                descriptor,
                handler,
            },
        );
        Ok(())
    }

    /// Validate arguments and run the named tool.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Option<JsonMap<String, JsonValue>>,
        cancel: CancellationToken,
    ) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = %name, "Unknown tool");
            return ToolResult::Failure {
                message: BridgeError::tool_not_found(name).to_string(),
            };
        };

        let arguments = match tool.descriptor.validate(arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(tool = %name, error = %e, "Rejected tool arguments");
                return ToolResult::Failure {
                    message: e.user_message(),
                };
            }
        };

        let start = Instant::now();
        let outcome = (tool.handler)(arguments, cancel).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(text) => {
                info!(tool = %name, elapsed_ms, "Tool call succeeded");
                ToolResult::Success { text }
            }
            Err(e) => {
                warn!(tool = %name, elapsed_ms, error = %e, "Tool call failed");
                ToolResult::Failure {
                    message: e.user_message(),
                }
            }
        }
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values().map(|t| &t.descriptor)
    }

    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name).map(|t| &t.descriptor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_issue() -> ToolDescriptor {
        ToolDescriptor::new("jira_get_issue", "Get an issue")
            .param(ParameterSpec::string("issue_key", "Issue key").required())
            .param(ParameterSpec::boolean("verbose", "More detail"))
    }

    fn args(value: JsonValue) -> Option<JsonMap<String, JsonValue>> {
        match value {
            JsonValue::Object(map) => Some(map),
            _ => None,
        }
    }

    #[test]
    fn test_input_schema_shape() {
        let schema = JsonValue::Object(get_issue().input_schema());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["issue_key"]["type"], "string");
        assert_eq!(schema["properties"]["verbose"]["type"], "boolean");
        assert_eq!(schema["required"], json!(["issue_key"]));
    }

    #[test]
    fn test_descriptor_serialization() {
        let value = serde_json::to_value(get_issue()).unwrap();
        assert_eq!(value["parameters"][0]["name"], "issue_key");
        assert_eq!(value["parameters"][0]["kind"], "string");
        assert_eq!(value["parameters"][0]["required"], true);
    }

    #[test]
    fn test_validate_missing_required() {
        let err = get_issue().validate(None).unwrap_err();
        assert!(err.to_string().contains("issue_key"));
    }

    #[test]
    fn test_validate_null_counts_as_missing() {
        let err = get_issue()
            .validate(args(json!({ "issue_key": null })))
            .unwrap_err();
        assert!(err.to_string().contains("Missing required parameter 'issue_key'"));
    }

    #[test]
    fn test_validate_wrong_kind() {
        let err = get_issue()
            .validate(args(json!({ "issue_key": 12 })))
            .unwrap_err();
        assert!(err.to_string().contains("'issue_key' must be a string"));
    }

    #[test]
    fn test_validate_optional_wrong_kind() {
        let err = get_issue()
            .validate(args(json!({ "issue_key": "KP-2", "verbose": "yes" })))
            .unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    fn test_validate_ignores_undeclared() {
        let accepted = get_issue()
            .validate(args(json!({ "issue_key": "KP-2", "extra": [1, 2] })))
            .unwrap();
        assert_eq!(accepted.str("issue_key"), Some("KP-2"));
        assert!(!accepted.contains("extra"));
    }

    #[test]
    fn test_tool_result_text() {
        let ok = ToolResult::Success { text: "done".into() };
        let failed = ToolResult::Failure {
            message: "boom".into(),
        };
        assert!(ok.is_success());
        assert!(!failed.is_success());
        assert_eq!(failed.text(), "boom");
    }
}
