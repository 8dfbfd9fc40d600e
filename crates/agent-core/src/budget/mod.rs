//! Context budget management for LLM conversations.
//!
//! The budget is a soft target measured with an approximate cost estimator.
//! It decides which part of a conversation is sent to the model; it never
//! mutates the stored history.
//!
//! # Key Components
//!
//! - [`counter`]: Token cost estimation via a character heuristic
//! - [`window`]: Most-recent-fits window selection that always keeps the system message

pub mod counter;
pub mod window;

pub use counter::{HeuristicTokenCounter, SharedTokenCounter, TokenCounter};
pub use window::{build_context_window, ContextWindow};
