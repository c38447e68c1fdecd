use serde::{Deserialize, Serialize};

use crate::types::{ToolCallRequest, ToolCallResult};

/// Default text of the synthetic nudge sent when the model should keep going.
pub const CONTINUE_PROMPT: &str = "Please continue.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
    Tool,
}

/// One entry of the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Tool calls requested by a model message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Set on tool messages: the call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolCallResult>,
    /// True for orchestrator-generated "continue" nudges.
    #[serde(default)]
    pub synthetic: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            call_id: None,
            result: None,
            synthetic: false,
        }
    }

    pub fn continue_nudge(prompt: impl Into<String>) -> Self {
        Self {
            synthetic: true,
            ..Self::user(prompt)
        }
    }

    pub fn model(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
            tool_calls,
            call_id: None,
            result: None,
            synthetic: false,
        }
    }

    pub fn tool_result(call: &ToolCallRequest, result: ToolCallResult) -> Self {
        Self {
            role: Role::Tool,
            content: result.to_content(),
            tool_calls: Vec::new(),
            call_id: Some(call.call_id.clone()),
            result: Some(result),
            synthetic: false,
        }
    }

    /// A model message with no visible text and no tool calls.
    pub fn is_empty_model_message(&self) -> bool {
        self.role == Role::Model && self.content.trim().is_empty() && self.tool_calls.is_empty()
    }
}

/// Ordered conversation history for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Replace the whole history (used by compression).
    pub fn replace(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }
}

impl From<Vec<ChatMessage>> for Transcript {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}
