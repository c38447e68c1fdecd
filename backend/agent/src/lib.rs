//! Turnstile agent runtime.
//!
//! The [`TurnOrchestrator`] drives one conversational request through model
//! turns and tool executions, bounded by a per-run [`OrchestrationBudget`], a
//! process-wide [`SessionLimiter`], and a [`turnstile_tools::LoopGuard`].
//! The [`SpeakerArbiter`] decides who speaks after a turn with no tool calls.

pub mod agent_loop;
pub mod budget;
pub mod context_window;
pub mod next_speaker;
pub mod session_limiter;
pub mod session_state;
pub mod token_statistics;
pub mod turn;

pub use agent_loop::{OrchestratorSettings, TurnOrchestrator};
pub use budget::{OrchestrationBudget, ABSOLUTE_TURN_CEILING, DEFAULT_MAX_TURNS};
pub use context_window::{estimate_tokens, try_compress, CompressionReport, CompressionSettings};
pub use next_speaker::SpeakerArbiter;
pub use session_limiter::{SessionLimiter, DEFAULT_MAX_SESSION_TURNS};
pub use session_state::SessionState;
pub use token_statistics::{ModelTokenSummary, TokenStatistics, TokenSummary, TokenUsageRecord};
pub use turn::Turn;
