//! Loop detection: stops a run when the model keeps repeating itself.
//!
//! Three independent checks share one trailing window size: identical tool
//! call signatures, identical tool failure messages, and consecutive
//! synthetic "continue" nudges.

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use turnstile_core::canonical_json;

/// Default trailing window for all three checks.
pub const DEFAULT_LOOP_WINDOW: usize = 3;

/// Detection state for a single top-level run.
#[derive(Debug, Clone, Serialize)]
pub struct LoopGuard {
    window: usize,
    /// Last `window` tool-call signatures, oldest first.
    tool_signatures: VecDeque<String>,
    /// Last `window` tool failure messages, oldest first.
    errors: VecDeque<String>,
    /// Continue nudges since the last tool call or user content.
    consecutive_continues: usize,
}

impl Default for LoopGuard {
    fn default() -> Self {
        Self::new(DEFAULT_LOOP_WINDOW)
    }
}

impl LoopGuard {
    /// A window of zero is treated as one.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            tool_signatures: VecDeque::with_capacity(window),
            errors: VecDeque::with_capacity(window),
            consecutive_continues: 0,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Record a tool call about to be executed. Returns `true` when this call
    /// completes a window of identical signatures and must not run.
    ///
    /// A tool call also breaks any streak of continue nudges.
    pub fn check_tool_loop(&mut self, name: &str, args: &Value) -> bool {
        self.consecutive_continues = 0;
        let signature = format!("{}:{}", name, canonical_json(args));
        let tripped = push_and_check(&mut self.tool_signatures, signature, self.window);
        if tripped {
            warn!(tool = %name, window = self.window, "Repeated tool call detected");
        }
        tripped
    }

    /// Record a tool failure message. Returns `true` when the last `window`
    /// failures all carried the same message.
    pub fn check_error_loop(&mut self, message: &str) -> bool {
        let tripped = push_and_check(&mut self.errors, message.trim().to_string(), self.window);
        if tripped {
            warn!(window = self.window, "Repeated tool error detected");
        }
        tripped
    }

    /// Record a synthetic continue nudge. Returns `true` when the last
    /// `window` turns were all nudges.
    pub fn check_continue_loop(&mut self) -> bool {
        self.consecutive_continues += 1;
        debug!(streak = self.consecutive_continues, "Continue nudge recorded");
        let tripped = self.consecutive_continues >= self.window;
        if tripped {
            warn!(window = self.window, "Continue loop detected");
        }
        tripped
    }

    /// Real user content arrived; the continue streak is over.
    pub fn note_user_content(&mut self) {
        self.consecutive_continues = 0;
    }

    pub fn consecutive_continues(&self) -> usize {
        self.consecutive_continues
    }
}

fn push_and_check(history: &mut VecDeque<String>, entry: String, window: usize) -> bool {
    history.push_back(entry);
    while history.len() > window {
        history.pop_front();
    }
    history.len() == window && history.iter().all(|e| e == &history[0])
}
