//! State carried by one conversation session across runs.

use serde::Serialize;

use turnstile_core::{ToolCallRequest, Transcript};

use crate::token_statistics::TokenStatistics;
use crate::turn::Turn;

/// Active state of a conversation session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub session_id: String,
    /// Full conversation history; survives across top-level requests.
    pub transcript: Transcript,
    pub token_stats: TokenStatistics,
    /// Turns of the most recent run, oldest first.
    pub turns: Vec<Turn>,
    /// Calls held back by the last run for user approval.
    pub pending_confirmation: Vec<ToolCallRequest>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            transcript: Transcript::new(),
            token_stats: TokenStatistics::new(),
            turns: Vec::new(),
            pending_confirmation: Vec::new(),
        }
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }
}
