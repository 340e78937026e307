//! Structured node execution results
//!
//! Every node execution, regardless of type or failure, produces this shape.
//! Failures are data, never panics or errors crossing the engine boundary.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of executing one workflow node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// What the caller should do (play_prompt, transfer_call, error, ...)
    pub action: String,
    /// Transition hint for the flow runner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Type-specific payload fields, flattened into the result object
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ExecutionResult {
    /// Successful result with an action
    pub fn ok(action: impl Into<String>) -> Self {
        Self {
            success: true,
            action: action.into(),
            next_action: None,
            error: None,
            payload: Map::new(),
        }
    }

    /// Failure result carrying the error message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            action: "error".to_string(),
            next_action: None,
            error: Some(message.into()),
            payload: Map::new(),
        }
    }

    /// Validation failure carrying every violated constraint
    pub fn validation_failed(errors: Vec<String>) -> Self {
        let mut result = Self {
            success: false,
            action: "validation_failed".to_string(),
            next_action: None,
            error: Some("Node data validation failed".to_string()),
            payload: Map::new(),
        };
        result.payload.insert(
            "errors".to_string(),
            Value::Array(errors.into_iter().map(Value::String).collect()),
        );
        result
    }

    pub fn with_next(mut self, next_action: impl Into<String>) -> Self {
        self.next_action = Some(next_action.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}
