//! Per-run turn budget.

use std::sync::Arc;

use crate::session_limiter::SessionLimiter;

/// Hard upper bound on any configured per-run budget.
pub const ABSOLUTE_TURN_CEILING: u32 = 100;

/// Default per-run budget.
pub const DEFAULT_MAX_TURNS: u32 = 100;

/// Remaining turns for one orchestration run, its recursion depth, and a
/// handle on the session-wide counter.
///
/// `remaining` is unsigned and only ever replaced by [`descend`], which
/// refuses to go below zero, so the run fails closed.
///
/// [`descend`]: OrchestrationBudget::descend
#[derive(Debug, Clone)]
pub struct OrchestrationBudget {
    remaining: u32,
    depth: u32,
    limiter: Arc<SessionLimiter>,
    session_id: String,
}

impl OrchestrationBudget {
    /// `turns` is clamped to `ceiling`.
    pub fn new(
        turns: u32,
        ceiling: u32,
        limiter: Arc<SessionLimiter>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            remaining: turns.min(ceiling),
            depth: 0,
            limiter,
            session_id: session_id.into(),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Charge one turn to the session-wide counter.
    pub async fn try_consume_session_turn(&self) -> bool {
        self.limiter.try_consume_turn(&self.session_id).await
    }

    /// Budget for the next recursive step, or `None` when nothing is left.
    pub fn descend(&self) -> Option<Self> {
        let remaining = self.remaining.checked_sub(1)?;
        Some(Self {
            remaining,
            depth: self.depth + 1,
            limiter: Arc::clone(&self.limiter),
            session_id: self.session_id.clone(),
        })
    }
}
