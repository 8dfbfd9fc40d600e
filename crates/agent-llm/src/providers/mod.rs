//! LLM Providers
//!
//! This module contains the LLM provider implementations.

pub(crate) mod common;
pub mod openai;

pub use openai::OpenAIProvider;
