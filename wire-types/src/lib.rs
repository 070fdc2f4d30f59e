//! Shared wire types between the environment daemon and the agent daemon.
//!
//! Everything that crosses a process boundary lives here: action
//! descriptors, argument/result containers, constants, and the steps
//! streamed to observers. Serializable with serde for JSON over
//! HTTP/WebSocket.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod codec;

pub use codec::{CodecError, Value};

// ============================================================================
// Actions
// ============================================================================

/// Opaque, stable identifier for a registered action.
///
/// Assigned once at registration and never reused; identifiers, not
/// names, are authoritative for invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable descriptor of a registered action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionInfo {
    pub action_id: ActionId,
    pub name: String,
    pub description: String,
    /// Rendered parameter list, e.g. `(x: float, y: float) -> bool`.
    pub signature: String,
}

/// A remotely exposed, read-only named value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Const {
    pub name: String,
    pub value: Value,
    pub description: String,
}

/// Positional and keyword arguments for one action invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionArgs {
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: BTreeMap<String, Value>,
}

impl ActionArgs {
    pub fn positional(args: Vec<Value>) -> Self {
        Self {
            args,
            kwargs: BTreeMap::new(),
        }
    }
}

/// The single return value of one action invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResult {
    pub result: Value,
}

// ============================================================================
// Steps
// ============================================================================

/// Who produced a step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
    System,
}

/// Structured metadata attached to a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepMeta {
    /// The assistant requested a tool invocation.
    ToolCall {
        name: String,
        arguments: serde_json::Value,
    },
    /// A tool returned; the returned content is the step's `content`.
    ToolOutput { name: String },
}

/// One atomic unit of agent activity within a run.
///
/// Steps are produced strictly in occurrence order and are append-only
/// within a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<StepMeta>,
}

impl Step {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            meta: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            meta: None,
        }
    }

    pub fn tool_call(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            meta: Some(StepMeta::ToolCall {
                name: name.into(),
                arguments,
            }),
        }
    }

    pub fn tool_output(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            meta: Some(StepMeta::ToolOutput { name: name.into() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_ids_are_distinct() {
        let a = ActionId::new();
        let b = ActionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn action_args_roundtrip_through_json() {
        let mut kwargs = BTreeMap::new();
        kwargs.insert("c".to_string(), Value::Int(7));
        let args = ActionArgs {
            args: vec![Value::Int(2), Value::Text("hi".into())],
            kwargs,
        };

        let json = serde_json::to_string(&args).unwrap();
        let back: ActionArgs = serde_json::from_str(&json).unwrap();
        assert_eq!(args, back);
    }

    #[test]
    fn action_args_default_fields_tolerated() {
        let back: ActionArgs = serde_json::from_str("{}").unwrap();
        assert!(back.args.is_empty());
        assert!(back.kwargs.is_empty());
    }

    #[test]
    fn step_meta_uses_tagged_encoding() {
        let step = Step::tool_call("move_to", serde_json::json!({"x": 1.0, "y": 2.0}));
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["meta"]["type"], "tool_call");
        assert_eq!(json["meta"]["name"], "move_to");

        let back: Step = serde_json::from_value(json).unwrap();
        assert_eq!(step, back);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Role::Assistant).unwrap(),
            serde_json::json!("assistant")
        );
    }
}
