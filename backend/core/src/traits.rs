use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::event::EventEnvelope;
use crate::message::ChatMessage;
use crate::types::{SpeakerDecision, TokenUsage, ToolCallRequest};

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name of the tool (e.g., "sql_query").
    fn name(&self) -> &str;

    /// Description for the model prompt.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters(&self) -> serde_json::Value;

    /// Whether this invocation needs explicit user approval before running.
    fn requires_confirmation(&self, _args: &serde_json::Value) -> bool {
        false
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value>;
}

/// One incremental piece of a model response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl ResponseFragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls: calls,
            ..Default::default()
        }
    }
}

pub type FragmentStream = BoxStream<'static, Result<ResponseFragment>>;

/// The hosted language model, seen as a stream of fragments.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Name of the model currently serving requests. Providers that fall back
    /// to another model report the new name here.
    fn active_model(&self) -> String;

    /// Send the full transcript and stream the response back.
    async fn send(
        &self,
        transcript: &[ChatMessage],
        cancel: CancellationToken,
    ) -> Result<FragmentStream>;
}

/// External judgment of who should speak next. Advisory only.
#[async_trait]
pub trait SpeakerJudge: Send + Sync {
    async fn judge(
        &self,
        transcript: &[ChatMessage],
        cancel: CancellationToken,
    ) -> Result<SpeakerDecision>;
}

/// Receives every event an orchestration run emits.
///
/// Implementations must not block; the orchestrator calls them inline.
pub trait EventSink: Send + Sync {
    fn emit(&self, envelope: &EventEnvelope);
}
