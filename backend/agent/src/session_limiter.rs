//! Process-wide per-session turn counters.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default session-wide turn ceiling.
pub const DEFAULT_MAX_SESSION_TURNS: u32 = 50;

/// Absolute cap on turns a single session may take across all its runs.
///
/// Shared by every orchestrator in the process (wrap it in an `Arc`); each
/// session id gets its own counter. A ceiling of zero disables the cap.
#[derive(Debug)]
pub struct SessionLimiter {
    ceiling: u32,
    counts: Mutex<HashMap<String, u32>>,
}

impl SessionLimiter {
    pub fn new(ceiling: u32) -> Self {
        Self {
            ceiling,
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn shared(ceiling: u32) -> Arc<Self> {
        Arc::new(Self::new(ceiling))
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Count one turn against `session_id`. Returns `false` once the ceiling
    /// has been reached; the refused turn is not counted.
    pub async fn try_consume_turn(&self, session_id: &str) -> bool {
        let mut counts = self.counts.lock().await;
        let used = counts.entry(session_id.to_string()).or_insert(0);
        if self.ceiling > 0 && *used >= self.ceiling {
            warn!(session_id, used = *used, ceiling = self.ceiling, "Session turn ceiling reached");
            return false;
        }
        *used += 1;
        debug!(session_id, used = *used, "Session turn consumed");
        true
    }

    pub async fn turns_used(&self, session_id: &str) -> u32 {
        self.counts.lock().await.get(session_id).copied().unwrap_or(0)
    }

    /// Forget a finished session.
    pub async fn end_session(&self, session_id: &str) {
        if self.counts.lock().await.remove(session_id).is_some() {
            info!(session_id, "Session counter reset");
        }
    }
}
