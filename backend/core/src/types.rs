use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A tool invocation requested by the model.
///
/// Two requests are the same *signature* when their names match and their
/// arguments serialize identically after canonicalization; the call id is
/// ignored for that comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub name: String,
    pub args: Value,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        let name = name.into();
        Self {
            call_id: format!("{}-{}", name, Uuid::new_v4()),
            name,
            args,
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }

    /// Name plus canonical JSON of the arguments.
    pub fn signature(&self) -> String {
        format!("{}:{}", self.name, canonical_json(&self.args))
    }

    /// Arguments must be an object (an argument mapping) or absent.
    pub fn has_valid_args(&self) -> bool {
        matches!(self.args, Value::Object(_) | Value::Null)
    }
}

impl PartialEq for ToolCallRequest {
    fn eq(&self, other: &Self) -> bool {
        self.signature() == other.signature()
    }
}

impl Eq for ToolCallRequest {}

/// Serialize a JSON value with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> String {
    fn sorted(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let mut out = serde_json::Map::new();
                for k in keys {
                    out.insert(k.clone(), sorted(&map[k]));
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
            other => other.clone(),
        }
    }
    sorted(value).to_string()
}

/// Why a tool call did not produce a payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The tool ran and reported an error.
    Execution,
    /// No tool with that name is registered.
    NotFound,
    /// The tool did not finish before its deadline.
    Timeout,
    /// The run was aborted while the tool was in flight.
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Execution => "execution",
            FailureKind::NotFound => "not_found",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a single tool call: a payload or a failure, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolCallResult {
    Success { output: Value },
    Failure(ToolFailure),
}

impl ToolCallResult {
    pub fn success(output: impl Into<Value>) -> Self {
        ToolCallResult::Success {
            output: output.into(),
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        ToolCallResult::Failure(ToolFailure {
            kind,
            message: message.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolCallResult::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ToolCallResult::Failure(f) => Some(f.kind),
            ToolCallResult::Success { .. } => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            ToolCallResult::Failure(f) => Some(&f.message),
            ToolCallResult::Success { .. } => None,
        }
    }

    /// Text form fed back to the model as turn content.
    pub fn to_content(&self) -> String {
        match self {
            ToolCallResult::Success { output } => match output {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            ToolCallResult::Failure(f) => format!("error ({}): {}", f.kind, f.message),
        }
    }
}

/// Who should produce the next message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerDecision {
    ModelContinues,
    UserTurn,
    Stop,
}

impl fmt::Display for SpeakerDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpeakerDecision::ModelContinues => "model_continues",
            SpeakerDecision::UserTurn => "user_turn",
            SpeakerDecision::Stop => "stop",
        };
        write!(f, "{}", s)
    }
}

/// Token counts reported by the model for one request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    #[serde(default)]
    pub cached_tokens: u64,
}
