//! Context window compression.
//!
//! When the transcript's estimated size passes a fraction of the model's
//! context limit, the oldest part of the history is folded into a single
//! summary message. The split always lands on a user message so a tool call
//! is never separated from its result.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use turnstile_core::{ChatMessage, Role, Transcript};

/// Prefix of the synthetic summary message.
pub const SUMMARY_HEADER: &str = "[Compressed conversation summary]";

const SUMMARY_LINES: usize = 10;
const SUMMARY_LINE_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionSettings {
    pub token_limit: usize,
    /// Fraction of `token_limit` above which compression kicks in.
    pub threshold: f64,
    /// Fraction of the transcript (newest messages) kept verbatim.
    pub preserve_fraction: f64,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            token_limit: 30_720,
            threshold: 0.5,
            preserve_fraction: 0.4,
        }
    }
}

impl CompressionSettings {
    fn trigger_tokens(&self) -> usize {
        (self.token_limit as f64 * self.threshold) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionReport {
    pub original_tokens: usize,
    pub compressed_tokens: usize,
}

/// Rough token estimate: four characters per token.
pub fn estimate_tokens(messages: &[ChatMessage]) -> usize {
    let chars: usize = messages
        .iter()
        .map(|m| {
            let calls: usize = m
                .tool_calls
                .iter()
                .map(|c| c.name.len() + c.args.to_string().len())
                .sum();
            m.content.chars().count() + calls
        })
        .sum();
    chars / 4
}

/// Compress `transcript` in place if it is over the trigger. Returns `None`
/// when nothing was done.
pub fn try_compress(
    transcript: &mut Transcript,
    settings: &CompressionSettings,
) -> Option<CompressionReport> {
    let original_tokens = estimate_tokens(transcript.messages());
    if original_tokens <= settings.trigger_tokens() {
        return None;
    }

    let messages = transcript.messages();
    let keep = (messages.len() as f64 * settings.preserve_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let mut split = messages.len().saturating_sub(keep);
    while split < messages.len() && messages[split].role != Role::User {
        split += 1;
    }
    if split == 0 || split >= messages.len() {
        debug!(original_tokens, "No user boundary to compress at");
        return None;
    }

    let mut compressed = Vec::with_capacity(messages.len() - split + 1);
    compressed.push(ChatMessage::user(summarize(&messages[..split])));
    compressed.extend_from_slice(&messages[split..]);

    let compressed_tokens = estimate_tokens(&compressed);
    if compressed_tokens >= original_tokens {
        debug!(original_tokens, compressed_tokens, "Compression would not shrink history");
        return None;
    }

    info!(
        original_tokens,
        compressed_tokens,
        folded = split,
        "Compressed conversation history"
    );
    transcript.replace(compressed);
    Some(CompressionReport {
        original_tokens,
        compressed_tokens,
    })
}

fn summarize(messages: &[ChatMessage]) -> String {
    let start = messages.len().saturating_sub(SUMMARY_LINES);
    let mut summary = String::from(SUMMARY_HEADER);
    for message in &messages[start..] {
        let text: String = message.content.chars().take(SUMMARY_LINE_CHARS).collect();
        summary.push('\n');
        summary.push_str(role_label(message.role));
        summary.push_str(": ");
        summary.push_str(&text);
    }
    summary
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
        Role::Tool => "tool",
    }
}
