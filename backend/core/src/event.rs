use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{SpeakerDecision, ToolCallRequest, ToolCallResult};

/// Which repetition the loop guard caught.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoopKind {
    /// The same tool call signature, back to back.
    RepeatedToolCall,
    /// The same tool failure message, back to back.
    RepeatedError,
    /// Consecutive synthetic "continue" nudges with nothing in between.
    RepeatedContinue,
}

/// Everything an orchestration run reports to its caller.
///
/// Exactly one terminal variant ends every run; see [`Event::is_terminal`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A model invocation is about to be made.
    TurnStarted { turn: u32 },
    ModelChunk { text: String },
    Thought { text: String },
    ChatCompressed {
        original_tokens: usize,
        compressed_tokens: usize,
    },
    ToolCallStarted { call: ToolCallRequest },
    ToolCallCompleted {
        call_id: String,
        name: String,
        result: ToolCallResult,
    },

    // Terminal events.
    TurnLimitReached { turn: u32 },
    SessionLimitReached { turn: u32 },
    LoopDetected { kind: LoopKind, detail: String },
    Aborted,
    AwaitingConfirmation { calls: Vec<ToolCallRequest> },
    ModelFailed { message: String },
    InternalSchedulingError { message: String },
    Done { decision: SpeakerDecision },
}

/// How a run ended, from the caller's point of view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The conversation reached a natural hand-off.
    Finished,
    /// A safety limit or an abort stopped the conversation.
    Stopped,
    /// Something went wrong.
    Failed,
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        match self {
            Event::Done { .. } | Event::AwaitingConfirmation { .. } => Some(RunOutcome::Finished),
            Event::TurnLimitReached { .. }
            | Event::SessionLimitReached { .. }
            | Event::LoopDetected { .. }
            | Event::Aborted => Some(RunOutcome::Stopped),
            Event::ModelFailed { .. } | Event::InternalSchedulingError { .. } => {
                Some(RunOutcome::Failed)
            }
            _ => None,
        }
    }

    /// Stable snake_case name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TurnStarted { .. } => "turn_started",
            Event::ModelChunk { .. } => "model_chunk",
            Event::Thought { .. } => "thought",
            Event::ChatCompressed { .. } => "chat_compressed",
            Event::ToolCallStarted { .. } => "tool_call_started",
            Event::ToolCallCompleted { .. } => "tool_call_completed",
            Event::TurnLimitReached { .. } => "turn_limit_reached",
            Event::SessionLimitReached { .. } => "session_limit_reached",
            Event::LoopDetected { .. } => "loop_detected",
            Event::Aborted => "aborted",
            Event::AwaitingConfirmation { .. } => "awaiting_confirmation",
            Event::ModelFailed { .. } => "model_failed",
            Event::InternalSchedulingError { .. } => "internal_scheduling_error",
            Event::Done { .. } => "done",
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// An [`Event`] plus the context sinks need to store it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub run_id: Uuid,
    pub session_id: String,
    pub turn: u32,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

impl EventEnvelope {
    pub fn new(run_id: Uuid, session_id: impl Into<String>, turn: u32, event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            session_id: session_id.into(),
            turn,
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureKind;

    #[test]
    fn terminal_classification() {
        assert_eq!(
            Event::Done {
                decision: SpeakerDecision::UserTurn
            }
            .outcome(),
            Some(RunOutcome::Finished)
        );
        assert_eq!(
            Event::LoopDetected {
                kind: LoopKind::RepeatedContinue,
                detail: String::new()
            }
            .outcome(),
            Some(RunOutcome::Stopped)
        );
        assert_eq!(Event::Aborted.outcome(), Some(RunOutcome::Stopped));
        assert_eq!(
            Event::InternalSchedulingError {
                message: "bad args".into()
            }
            .outcome(),
            Some(RunOutcome::Failed)
        );
        assert!(!Event::ModelChunk { text: "hi".into() }.is_terminal());
        assert!(!Event::ToolCallCompleted {
            call_id: "c".into(),
            name: "sql".into(),
            result: ToolCallResult::failure(FailureKind::Timeout, "late"),
        }
        .is_terminal());
    }

    #[test]
    fn event_serialization_is_tagged() {
        let event = Event::TurnLimitReached { turn: 2 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "turn_limit_reached");
        assert_eq!(json["turn"], 2);
        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn event_display_uses_kind() {
        assert_eq!(Event::Aborted.to_string(), "aborted");
        assert_eq!(
            Event::ChatCompressed {
                original_tokens: 10,
                compressed_tokens: 4
            }
            .to_string(),
            "chat_compressed"
        );
    }

    #[test]
    fn envelope_carries_context() {
        let run_id = Uuid::new_v4();
        let env = EventEnvelope::new(run_id, "s-1", 3, Event::Aborted);
        assert_eq!(env.run_id, run_id);
        assert_eq!(env.session_id, "s-1");
        assert_eq!(env.turn, 3);
    }
}
