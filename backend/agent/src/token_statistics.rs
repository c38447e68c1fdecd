//! Per-session token accounting.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use turnstile_core::TokenUsage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsageRecord {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub usage: TokenUsage,
}

impl TokenUsageRecord {
    /// Prompt tokens actually billed: cached tokens are free.
    pub fn billable_prompt_tokens(&self) -> u64 {
        self.usage.prompt_tokens.saturating_sub(self.usage.cached_tokens)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTokenSummary {
    pub calls: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cached_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSummary {
    pub total_calls: u64,
    /// Billable prompt tokens (prompt minus cached).
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub total_tokens: u64,
    pub total_cached_tokens: u64,
    pub original_prompt_tokens: u64,
    pub by_model: BTreeMap<String, ModelTokenSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenStatistics {
    records: Vec<TokenUsageRecord>,
}

impl TokenStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_usage(&mut self, model: impl Into<String>, usage: TokenUsage) {
        let record = TokenUsageRecord {
            timestamp: Utc::now(),
            model: model.into(),
            usage,
        };
        debug!(
            model = %record.model,
            prompt = record.billable_prompt_tokens(),
            completion = record.usage.completion_tokens,
            cached = record.usage.cached_tokens,
            "Token usage recorded"
        );
        self.records.push(record);
    }

    pub fn records(&self) -> &[TokenUsageRecord] {
        &self.records
    }

    pub fn summary(&self) -> TokenSummary {
        let mut summary = TokenSummary::default();
        for record in &self.records {
            let billable = record.billable_prompt_tokens();
            let completion = record.usage.completion_tokens;
            let cached = record.usage.cached_tokens;

            summary.total_calls += 1;
            summary.total_prompt_tokens += billable;
            summary.total_completion_tokens += completion;
            summary.total_tokens += billable + completion;
            summary.total_cached_tokens += cached;
            summary.original_prompt_tokens += record.usage.prompt_tokens;

            let entry = summary.by_model.entry(record.model.clone()).or_default();
            entry.calls += 1;
            entry.prompt_tokens += billable;
            entry.completion_tokens += completion;
            entry.total_tokens += billable + completion;
            entry.cached_tokens += cached;
        }
        summary
    }
}
