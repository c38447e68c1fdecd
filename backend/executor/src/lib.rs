//! Turnstile tool executor: runs the tool calls of one turn concurrently,
//! each bounded by a deadline and the run's cancellation token.

pub mod executor;

pub use executor::{ToolExecutor, DEFAULT_TOOL_TIMEOUT};
