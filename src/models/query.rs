//! Query parameter models.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{BridgeError, BridgeResult};

/// A positional parameter value for parameterized statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
}

impl QueryParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    /// Convert a JSON scalar into a parameter. Arrays and objects are rejected.
    pub fn from_json(value: &JsonValue) -> BridgeResult<Self> {
        match value {
            JsonValue::Null => Ok(Self::Null),
            JsonValue::Bool(b) => Ok(Self::Bool(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Int(i)),
                None => n.as_f64().map(Self::Float).ok_or_else(|| {
                    BridgeError::invalid_input(format!("Unsupported numeric parameter: {n}"))
                }),
            },
            JsonValue::String(s) => Ok(Self::String(s.clone())),
            JsonValue::Array(_) | JsonValue::Object(_) => Err(BridgeError::invalid_input(
                "Parameters must be scalars (null, boolean, number or string)",
            )),
        }
    }
}

/// Parse the `params` tool argument: a JSON array of scalars encoded as a
/// string. An absent or blank argument means no parameters.
pub fn parse_params(raw: Option<&str>) -> BridgeResult<Vec<QueryParam>> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(Vec::new()),
        Some(raw) => raw,
    };

    let value: JsonValue = serde_json::from_str(raw).map_err(|e| {
        BridgeError::invalid_input(format!("'params' must be a JSON array: {e}"))
    })?;

    match value {
        JsonValue::Array(items) => items.iter().map(QueryParam::from_json).collect(),
        _ => Err(BridgeError::invalid_input("'params' must be a JSON array")),
    }
}
