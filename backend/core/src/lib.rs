//! Turnstile core: the data model, event vocabulary, error type, and the
//! collaborator traits (model service, tools, speaker judge, event sinks)
//! that the turn orchestrator is written against.

pub mod channel;
pub mod error;
pub mod event;
pub mod message;
pub mod tools;
pub mod traits;
pub mod types;

pub use channel::ChannelSink;
pub use error::TurnstileError;
pub use event::{Event, EventEnvelope, LoopKind, RunOutcome};
pub use message::{ChatMessage, Role, Transcript, CONTINUE_PROMPT};
pub use tools::ToolRegistry;
pub use traits::{EventSink, FragmentStream, ModelService, ResponseFragment, SpeakerJudge, Tool};
pub use types::{
    canonical_json, FailureKind, SpeakerDecision, TokenUsage, ToolCallRequest, ToolCallResult,
    ToolFailure,
};
