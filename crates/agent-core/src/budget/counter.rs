//! Token counting for budget management.
//!
//! Provides a heuristic estimate (about one token per four characters). The
//! numbers are not calibrated against any real tokenizer and must only be
//! used for budgeting decisions.

use crate::agent::types::Message;
use std::sync::Arc;

/// Trait for token counting implementations.
///
/// Implementations must be deterministic and monotone: a longer text never
/// yields a smaller estimate.
pub trait TokenCounter: Send + Sync {
    /// Count tokens in a single message.
    fn count_message(&self, message: &Message) -> u32 {
        self.count_text(message.role.as_str())
            .saturating_add(self.count_text(&message.content))
    }

    /// Count tokens in multiple messages.
    fn count_messages(&self, messages: &[Message]) -> u32 {
        messages
            .iter()
            .fold(0u32, |acc, m| acc.saturating_add(self.count_message(m)))
    }

    /// Count tokens in a plain text string.
    fn count_text(&self, text: &str) -> u32;
}

/// Heuristic token counter using character-based estimation.
///
/// Every text costs at least one token, so an empty message still charges
/// its role label and content against the budget.
#[derive(Debug, Clone)]
pub struct HeuristicTokenCounter {
    /// Characters per token ratio (default: 4)
    chars_per_token: usize,
}

impl HeuristicTokenCounter {
    /// Create a counter with a custom ratio. A ratio of zero is treated as one.
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(4)
    }
}

impl Default for HeuristicTokenCounter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TokenCounter for HeuristicTokenCounter {
    fn count_text(&self, text: &str) -> u32 {
        let estimate = text.chars().count() / self.chars_per_token;
        u32::try_from(estimate).unwrap_or(u32::MAX).max(1)
    }
}

/// Arc-wrapped token counter for easy sharing.
pub type SharedTokenCounter = Arc<dyn TokenCounter>;
