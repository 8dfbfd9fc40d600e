//! Context window selection.
//!
//! Picks the part of a conversation sent to the model for one call:
//! 1. The first (system) message is always included and charged first, even
//!    when it alone exceeds the budget.
//! 2. Remaining messages are walked from newest to oldest; each one that fits
//!    the remaining budget is kept.
//! 3. The walk stops at the first message that does not fit, so the result is
//!    always the most recent contiguous run, never a best-fit packing.
//! 4. Output order is the system message followed by the kept messages in
//!    chronological order.

use crate::agent::events::TokenBudgetUsage;
use crate::agent::types::Message;
use crate::budget::counter::TokenCounter;

/// Borrowed view over the messages selected for one backend call.
#[derive(Debug, Clone)]
pub struct ContextWindow<'a> {
    pub messages: Vec<&'a Message>,
    pub system_tokens: u32,
    pub window_tokens: u32,
    pub budget: u32,
    pub messages_dropped: usize,
}

impl<'a> ContextWindow<'a> {
    fn empty(budget: u32) -> Self {
        Self {
            messages: Vec::new(),
            system_tokens: 0,
            window_tokens: 0,
            budget,
            messages_dropped: 0,
        }
    }

    pub fn total_tokens(&self) -> u32 {
        self.system_tokens.saturating_add(self.window_tokens)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn truncated(&self) -> bool {
        self.messages_dropped > 0
    }

    /// Owned copy of the selected messages, as handed to a provider.
    pub fn to_messages(&self) -> Vec<Message> {
        self.messages.iter().map(|m| (*m).clone()).collect()
    }

    pub fn usage(&self) -> TokenBudgetUsage {
        TokenBudgetUsage {
            system_tokens: self.system_tokens,
            window_tokens: self.window_tokens,
            total_tokens: self.total_tokens(),
            budget_limit: self.budget,
            truncation_occurred: self.truncated(),
            messages_dropped: self.messages_dropped,
        }
    }
}

/// Select the messages of `history` to send under `budget`.
///
/// `history` only needs to be double-ended, which lets callers chain a staged
/// message that is not yet part of the stored conversation:
///
/// ```ignore
/// let pending = Message::user("What's the weather?");
/// let window = build_context_window(
///     conversation.messages().iter().chain(std::iter::once(&pending)),
///     800,
///     &HeuristicTokenCounter::default(),
/// );
/// ```
pub fn build_context_window<'a, I>(
    history: I,
    budget: u32,
    counter: &dyn TokenCounter,
) -> ContextWindow<'a>
where
    I: IntoIterator<Item = &'a Message>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut iter = history.into_iter();

    let Some(system_message) = iter.next() else {
        return ContextWindow::empty(budget);
    };

    let system_tokens = counter.count_message(system_message);
    if system_tokens > budget {
        log::warn!(
            "System message ({} tokens) exceeds context budget ({} tokens), sending it anyway",
            system_tokens,
            budget
        );
    }

    let mut used = system_tokens;
    let mut selected: Vec<&'a Message> = Vec::new();
    let mut messages_dropped = 0usize;

    let mut newest_first = iter.rev();
    while let Some(message) = newest_first.next() {
        let cost = counter.count_message(message);
        if used.saturating_add(cost) > budget {
            messages_dropped = 1 + newest_first.count();
            break;
        }
        used = used.saturating_add(cost);
        selected.push(message);
    }

    selected.reverse();

    let mut messages = Vec::with_capacity(selected.len() + 1);
    messages.push(system_message);
    messages.extend(selected);

    ContextWindow {
        messages,
        system_tokens,
        window_tokens: used - system_tokens,
        budget,
        messages_dropped,
    }
}
