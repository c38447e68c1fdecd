use serde::Serialize;

use turnstile_core::{ChatMessage, ToolCallRequest, ToolCallResult};

/// One model invocation and what came of it.
///
/// Built up while the model streams; frozen once tool results are attached
/// or the turn is marked terminal.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    index: u32,
    input: ChatMessage,
    text: String,
    tool_calls: Vec<ToolCallRequest>,
    results: Vec<ToolCallResult>,
    terminal: bool,
    #[serde(skip)]
    sealed: bool,
}

impl Turn {
    pub(crate) fn new(index: u32, input: ChatMessage) -> Self {
        Self {
            index,
            input,
            text: String::new(),
            tool_calls: Vec::new(),
            results: Vec::new(),
            terminal: false,
            sealed: false,
        }
    }

    pub(crate) fn push_text(&mut self, chunk: &str) {
        if !self.sealed {
            self.text.push_str(chunk);
        }
    }

    pub(crate) fn push_calls(&mut self, calls: impl IntoIterator<Item = ToolCallRequest>) {
        if !self.sealed {
            self.tool_calls.extend(calls);
        }
    }

    /// Attach the results of this turn's calls. Only the first attachment
    /// counts; the turn is sealed afterwards.
    pub(crate) fn attach_results(&mut self, results: Vec<ToolCallResult>) {
        if self.sealed {
            return;
        }
        self.results = results;
        self.sealed = true;
    }

    pub(crate) fn mark_terminal(&mut self) {
        self.terminal = true;
        self.sealed = true;
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn input(&self) -> &ChatMessage {
        &self.input
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        &self.tool_calls
    }

    pub fn results(&self) -> &[ToolCallResult] {
        &self.results
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turnstile_core::FailureKind;

    #[test]
    fn results_attach_once() {
        let mut turn = Turn::new(1, ChatMessage::user("q"));
        turn.push_text("checking");
        turn.push_calls(vec![ToolCallRequest::new("sql", json!({}))]);
        turn.attach_results(vec![ToolCallResult::success(json!(1))]);
        turn.attach_results(vec![ToolCallResult::failure(FailureKind::Timeout, "late")]);
        turn.push_text(" more");

        assert_eq!(turn.text(), "checking");
        assert_eq!(turn.results(), &[ToolCallResult::success(json!(1))]);
        assert_eq!(turn.tool_calls().len(), 1);
        assert!(!turn.is_terminal());
    }

    #[test]
    fn terminal_turn_is_frozen() {
        let mut turn = Turn::new(3, ChatMessage::continue_nudge("Please continue."));
        turn.mark_terminal();
        turn.push_text("ignored");
        assert!(turn.is_terminal());
        assert_eq!(turn.index(), 3);
        assert!(turn.input().synthetic);
        assert!(turn.text().is_empty());
    }
}
