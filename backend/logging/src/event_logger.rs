//! Event sink that writes every orchestration event to `tracing`.
//!
//! Events go out under the `turnstile_events` target, so a subscriber can
//! route them to their own file. Tool arguments, tool output, model text and
//! failure messages are redacted first.

use tracing::{debug, info};

use turnstile_core::{Event, EventEnvelope, EventSink, ToolCallResult, ToolFailure};

use crate::redact::{redact_sensitive_data, redact_value};

/// Target used for every event record.
pub const EVENT_TARGET: &str = "turnstile_events";

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, envelope: &EventEnvelope) {
        let event = redact_event(&envelope.event);
        let payload = serde_json::to_string(&event).unwrap_or_else(|e| e.to_string());
        match &event {
            Event::ModelChunk { .. } | Event::Thought { .. } => debug!(
                target: EVENT_TARGET,
                run_id = %envelope.run_id,
                session_id = %envelope.session_id,
                turn = envelope.turn,
                kind = event.kind(),
                event = %payload,
                "Orchestration event"
            ),
            _ => info!(
                target: EVENT_TARGET,
                run_id = %envelope.run_id,
                session_id = %envelope.session_id,
                turn = envelope.turn,
                kind = event.kind(),
                terminal = event.is_terminal(),
                event = %payload,
                "Orchestration event"
            ),
        }
    }
}

/// Copy of `event` with user and tool content scrubbed.
pub fn redact_event(event: &Event) -> Event {
    match event {
        Event::ModelChunk { text } => Event::ModelChunk {
            text: redact_sensitive_data(text),
        },
        Event::Thought { text } => Event::Thought {
            text: redact_sensitive_data(text),
        },
        Event::ToolCallStarted { call } => {
            let mut call = call.clone();
            call.args = redact_value(&call.args);
            Event::ToolCallStarted { call }
        }
        Event::ToolCallCompleted {
            call_id,
            name,
            result,
        } => Event::ToolCallCompleted {
            call_id: call_id.clone(),
            name: name.clone(),
            result: redact_result(result),
        },
        Event::AwaitingConfirmation { calls } => Event::AwaitingConfirmation {
            calls: calls
                .iter()
                .map(|c| {
                    let mut c = c.clone();
                    c.args = redact_value(&c.args);
                    c
                })
                .collect(),
        },
        Event::ModelFailed { message } => Event::ModelFailed {
            message: redact_sensitive_data(message),
        },
        other => other.clone(),
    }
}

fn redact_result(result: &ToolCallResult) -> ToolCallResult {
    match result {
        ToolCallResult::Success { output } => ToolCallResult::Success {
            output: redact_value(output),
        },
        ToolCallResult::Failure(f) => ToolCallResult::Failure(ToolFailure {
            kind: f.kind,
            message: redact_sensitive_data(&f.message),
        }),
    }
}
