//! Two-phase tool-calling protocol.
//!
//! Phase 1 sends the context window plus the capability descriptors with tool
//! choice `auto`. A direct answer ends the turn. Otherwise the assistant
//! tool-call message and one tool-result message per request are appended,
//! and Phase 2 asks again without tools for the final answer. Only one round
//! of tool invocation is supported.
//!
//! History is only written once Phase 1 has succeeded: a Phase 1 failure
//! leaves the conversation untouched, a Phase 2 failure leaves the user
//! message and the tool messages in place but no answer.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use agent_core::tools::{parse_tool_args_or_default, ToolCall, ToolSchema};
use agent_core::{
    build_context_window, AgentError, AgentEvent, Conversation, Message, Role, ToolRegistry,
    TokenBudgetUsage, TokenCounter, TokenUsage, ToolResult,
};
use agent_llm::{LLMProvider, ToolChoice};

use crate::config::AgentLoopConfig;
use crate::stream::{consume_llm_stream, StreamHandlingOutput};

pub type Result<T> = std::result::Result<T, AgentError>;

/// What one orchestrated turn produced.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorOutcome {
    pub answer: String,
    /// Every capability payload of the turn, in request order.
    pub tool_results: Vec<ToolResult>,
    pub used_tools: bool,
}

pub struct ToolOrchestrator {
    llm: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentLoopConfig,
    event_tx: Option<mpsc::Sender<AgentEvent>>,
}

impl ToolOrchestrator {
    pub fn new(llm: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>, config: AgentLoopConfig) -> Self {
        Self {
            llm,
            tools,
            config,
            event_tx: None,
        }
    }

    /// Forward progress events (tokens, tool activity, budget usage) to `event_tx`.
    pub fn with_events(mut self, event_tx: mpsc::Sender<AgentEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn config(&self) -> &AgentLoopConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer `user_request`, letting the model call registered capabilities.
    pub async fn run(
        &self,
        user_request: &str,
        conversation: &mut Conversation,
    ) -> Result<OrchestratorOutcome> {
        self.respond(user_request, conversation, true, None).await
    }

    /// Answer `user_request` with a single call and no capabilities.
    pub async fn complete(
        &self,
        user_request: &str,
        conversation: &mut Conversation,
    ) -> Result<OrchestratorOutcome> {
        self.respond(user_request, conversation, false, None).await
    }

    /// Shared turn driver. `follow_up` is appended to the stored and returned
    /// answer, separated by a blank line.
    pub(crate) async fn respond(
        &self,
        user_request: &str,
        conversation: &mut Conversation,
        offer_tools: bool,
        follow_up: Option<&str>,
    ) -> Result<OrchestratorOutcome> {
        let session_id = conversation.id.clone();
        let pending = Message::user(user_request);
        let schemas: Vec<ToolSchema> = if offer_tools {
            self.tools.list_tools()
        } else {
            Vec::new()
        };
        let tool_choice = (!schemas.is_empty()).then_some(ToolChoice::Auto);

        let (mut sent, mut usage) = {
            let window = build_context_window(
                conversation.messages().iter().chain(std::iter::once(&pending)),
                self.config.token_budget,
                self.config.token_counter.as_ref(),
            );
            (window.to_messages(), window.usage())
        };

        let orphaned = drop_orphaned_tool_results(&mut sent);
        if !orphaned.is_empty() {
            let cost = self.config.token_counter.count_messages(&orphaned);
            log::debug!(
                "[{}] Left out {} tool result(s) whose tool-call message is outside the window",
                session_id,
                orphaned.len()
            );
            usage.window_tokens = usage.window_tokens.saturating_sub(cost);
            usage.total_tokens = usage.total_tokens.saturating_sub(cost);
            usage.messages_dropped += orphaned.len();
            usage.truncation_occurred = true;
        }

        log::debug!(
            "[{}] Phase 1: {} of {} messages, ~{} / {} tokens, {} tools",
            session_id,
            sent.len(),
            conversation.len() + 1,
            usage.total_tokens,
            usage.budget_limit,
            schemas.len()
        );
        let mut prompt_tokens = usage.total_tokens;
        self.emit(AgentEvent::TokenBudgetUpdated { usage }).await;

        let proposal = self
            .call_model(&session_id, &sent, &schemas, tool_choice)
            .await?;

        conversation.push(pending);

        if proposal.tool_calls.is_empty() {
            return Ok(self
                .finish(conversation, proposal.content, Vec::new(), follow_up, prompt_tokens)
                .await);
        }

        log::info!(
            "[{}] Model requested {} tool call(s)",
            session_id,
            proposal.tool_calls.len()
        );

        let tool_call_message = Message::assistant(proposal.content, Some(proposal.tool_calls.clone()));
        conversation.push(tool_call_message.clone());
        sent.push(tool_call_message);

        let mut tool_results = Vec::with_capacity(proposal.tool_calls.len());
        for tool_call in &proposal.tool_calls {
            let result = self.invoke(&session_id, tool_call).await;
            let message = result.to_message();
            conversation.push(message.clone());
            sent.push(message);
            tool_results.push(result);
        }

        let counter = self.config.token_counter.as_ref();
        let phase_two_tokens = counter.count_messages(&sent);
        let system_tokens = counter.count_message(conversation.system_message());
        let messages_dropped = conversation.len().saturating_sub(sent.len());
        log::debug!(
            "[{}] Phase 2: {} messages, ~{} tokens",
            session_id,
            sent.len(),
            phase_two_tokens
        );
        prompt_tokens = prompt_tokens.saturating_add(phase_two_tokens);
        self.emit(AgentEvent::TokenBudgetUpdated {
            usage: TokenBudgetUsage {
                system_tokens,
                window_tokens: phase_two_tokens.saturating_sub(system_tokens),
                total_tokens: phase_two_tokens,
                budget_limit: self.config.token_budget,
                truncation_occurred: messages_dropped > 0,
                messages_dropped,
            },
        })
        .await;

        let resolution = self.call_model(&session_id, &sent, &[], None).await?;
        if !resolution.tool_calls.is_empty() {
            log::warn!(
                "[{}] Ignoring {} tool call(s) requested after tool results; only one round is supported",
                session_id,
                resolution.tool_calls.len()
            );
        }

        Ok(self
            .finish(conversation, resolution.content, tool_results, follow_up, prompt_tokens)
            .await)
    }

    async fn finish(
        &self,
        conversation: &mut Conversation,
        content: String,
        tool_results: Vec<ToolResult>,
        follow_up: Option<&str>,
        prompt_tokens: u32,
    ) -> OrchestratorOutcome {
        let completion_tokens = self.config.token_counter.count_text(&content);
        let answer = match follow_up {
            Some(follow_up) => format!("{content}\n\n{follow_up}"),
            None => content,
        };

        conversation.push(Message::assistant(answer.clone(), None));
        self.emit(AgentEvent::Complete {
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens.saturating_add(completion_tokens),
            },
        })
        .await;

        OrchestratorOutcome {
            answer,
            used_tools: !tool_results.is_empty(),
            tool_results,
        }
    }

    /// Resolve and run one requested capability. Never fails: unknown names
    /// and capability errors become `{"error": ...}` payloads.
    async fn invoke(&self, session_id: &str, tool_call: &ToolCall) -> ToolResult {
        let name = tool_call.function.name.as_str();
        let args = parse_tool_args_or_default(&tool_call.function.arguments);

        self.emit(AgentEvent::ToolStart {
            tool_call_id: tool_call.id.clone(),
            tool_name: name.to_string(),
            arguments: args.clone(),
        })
        .await;

        match self.tools.invoke(name, args).await {
            Ok(payload) => {
                log::debug!("[{}] Tool '{}' completed", session_id, name);
                let result = ToolResult::success(&tool_call.id, name, payload);
                self.emit(AgentEvent::ToolComplete {
                    tool_call_id: tool_call.id.clone(),
                    result: result.clone(),
                })
                .await;
                result
            }
            Err(error) => {
                log::warn!("[{}] Tool '{}' failed: {}", session_id, name, error);
                self.emit(AgentEvent::ToolError {
                    tool_call_id: tool_call.id.clone(),
                    error: error.to_string(),
                })
                .await;
                ToolResult::error(&tool_call.id, name, error.to_string())
            }
        }
    }

    async fn call_model(
        &self,
        session_id: &str,
        messages: &[Message],
        tools: &[ToolSchema],
        tool_choice: Option<ToolChoice>,
    ) -> Result<StreamHandlingOutput> {
        let options = self.config.request_options();
        let call = async {
            let stream = self
                .llm
                .chat_stream(messages, tools, tool_choice, &options)
                .await
                .map_err(AgentError::from)?;
            consume_llm_stream(stream, self.event_tx.as_ref(), session_id).await
        };

        let result = match self.config.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(AgentError::BackendUnavailable(format!(
                    "model call timed out after {limit:?}"
                ))),
            },
            None => call.await,
        };

        if let Err(error) = &result {
            log::error!("[{}] Model call failed: {}", session_id, error);
            self.emit(AgentEvent::Error {
                message: error.to_string(),
            })
            .await;
        }

        result
    }

    async fn emit(&self, event: AgentEvent) {
        if let Some(event_tx) = &self.event_tx {
            let _ = event_tx.send(event).await;
        }
    }
}

/// Remove tool results right after the system message. Their assistant
/// tool-call message was cut from the window, and backends reject a tool
/// message without one.
fn drop_orphaned_tool_results(sent: &mut Vec<Message>) -> Vec<Message> {
    let start = sent.len().min(1);
    let end = sent[start..]
        .iter()
        .position(|message| message.role != Role::Tool)
        .map_or(sent.len(), |offset| start + offset);
    sent.drain(start..end).collect()
}
