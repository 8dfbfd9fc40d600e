//! Yes/no follow-up state machine around the orchestrator.
//!
//! | state                  | input   | effect                                          | next state             |
//! |------------------------|---------|-------------------------------------------------|------------------------|
//! | `Idle`                 | text    | answer + follow-up question                     | `AwaitingConfirmation` |
//! | `AwaitingConfirmation` | yes / y | "more info" request, elaborated answer          | `AwaitingConfirmation` |
//! | `AwaitingConfirmation` | no / n  | acknowledgement appended, no model call         | `Idle`                 |
//! | `AwaitingConfirmation` | other   | re-prompt, history untouched, no model call     | `AwaitingConfirmation` |
//!
//! A backend failure leaves the state as it was. A Phase 1 failure also
//! leaves the history untouched. A Phase 2 failure keeps the user message and
//! the tool messages already committed, without an answer.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use agent_core::{AgentError, AgentEvent, Conversation, Message, ToolRegistry, ToolResult};
use agent_llm::LLMProvider;

use crate::config::AgentLoopConfig;
use crate::orchestrator::{Result, ToolOrchestrator};

pub const FOLLOW_UP_QUESTION: &str = "Do you want more info?";
pub const MORE_INFO_REQUEST: &str = "Yes, please give me more info.";
pub const ACKNOWLEDGEMENT: &str = "Okay! What can I help you with?";
pub const REPROMPT: &str = "Please type Yes or No. Do you want more info?";

const AFFIRMATIVE: &[&str] = &["yes", "y"];
const NEGATIVE: &[&str] = &["no", "n"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    #[default]
    Idle,
    AwaitingConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationReply {
    Yes,
    No,
}

impl ConfirmationReply {
    /// Case-insensitive exact match against the yes/no vocabulary.
    pub fn parse(input: &str) -> Result<Self> {
        let normalized = input.trim().to_lowercase();
        if AFFIRMATIVE.contains(&normalized.as_str()) {
            Ok(ConfirmationReply::Yes)
        } else if NEGATIVE.contains(&normalized.as_str()) {
            Ok(ConfirmationReply::No)
        } else {
            Err(AgentError::InvalidUserReply(input.trim().to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Model answer, follow-up question included.
    Answered {
        answer: String,
        tool_results: Vec<ToolResult>,
    },
    Acknowledged { message: String },
    Reprompt { message: String },
    /// Blank input; nothing happened.
    Ignored,
}

impl TurnOutcome {
    /// Text to show the user, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            TurnOutcome::Answered { answer, .. } => Some(answer),
            TurnOutcome::Acknowledged { message } | TurnOutcome::Reprompt { message } => {
                Some(message)
            }
            TurnOutcome::Ignored => None,
        }
    }
}

/// One dialogue: a conversation, its turn state and the orchestrator
/// answering for it.
pub struct ChatSession {
    conversation: Conversation,
    state: TurnState,
    orchestrator: ToolOrchestrator,
}

impl ChatSession {
    pub fn new(llm: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>, config: AgentLoopConfig) -> Self {
        let conversation = Conversation::new(config.system_prompt.clone());
        Self {
            conversation,
            state: TurnState::Idle,
            orchestrator: ToolOrchestrator::new(llm, tools, config),
        }
    }

    pub fn with_events(mut self, event_tx: mpsc::Sender<AgentEvent>) -> Self {
        self.orchestrator = self.orchestrator.with_events(event_tx);
        self
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn session_id(&self) -> &str {
        &self.conversation.id
    }

    pub async fn handle_input(&mut self, input: &str) -> Result<TurnOutcome> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        match self.state {
            TurnState::Idle => self.answer(input).await,
            TurnState::AwaitingConfirmation => match ConfirmationReply::parse(input) {
                Ok(ConfirmationReply::Yes) => self.answer(MORE_INFO_REQUEST).await,
                Ok(ConfirmationReply::No) => {
                    self.conversation
                        .push(Message::assistant(ACKNOWLEDGEMENT, None));
                    self.state = TurnState::Idle;
                    Ok(TurnOutcome::Acknowledged {
                        message: ACKNOWLEDGEMENT.to_string(),
                    })
                }
                Err(error) => {
                    log::debug!("[{}] {}", self.conversation.id, error);
                    Ok(TurnOutcome::Reprompt {
                        message: REPROMPT.to_string(),
                    })
                }
            },
        }
    }

    async fn answer(&mut self, request: &str) -> Result<TurnOutcome> {
        let offer_tools = !self.orchestrator.tools().is_empty();
        let outcome = self
            .orchestrator
            .respond(
                request,
                &mut self.conversation,
                offer_tools,
                Some(FOLLOW_UP_QUESTION),
            )
            .await?;

        self.state = TurnState::AwaitingConfirmation;
        Ok(TurnOutcome::Answered {
            answer: outcome.answer,
            tool_results: outcome.tool_results,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::{answer, backend_down, tool_request, CountingTool, ScriptedLLM};
    use agent_core::Role;

    fn session(llm: Arc<ScriptedLLM>) -> ChatSession {
        ChatSession::new(llm, Arc::new(ToolRegistry::new()), AgentLoopConfig::default())
    }

    #[test]
    fn confirmation_vocabulary() {
        for input in ["yes", "Y", " YES ", "y"] {
            assert_eq!(ConfirmationReply::parse(input).unwrap(), ConfirmationReply::Yes);
        }
        for input in ["no", "N", "No "] {
            assert_eq!(ConfirmationReply::parse(input).unwrap(), ConfirmationReply::No);
        }
        for input in ["maybe", "yes please", "nope", ""] {
            assert!(matches!(
                ConfirmationReply::parse(input),
                Err(AgentError::InvalidUserReply(_))
            ));
        }
    }

    #[tokio::test]
    async fn round_trip_through_both_states() {
        let llm = Arc::new(ScriptedLLM::new(vec![
            answer("Rust is a systems language."),
            answer("It has ownership and borrowing."),
        ]));
        let mut chat = session(llm.clone());
        assert_eq!(chat.state(), TurnState::Idle);

        let outcome = chat.handle_input("What is Rust?").await.unwrap();
        assert_eq!(
            outcome.text(),
            Some("Rust is a systems language.\n\nDo you want more info?")
        );
        assert_eq!(chat.state(), TurnState::AwaitingConfirmation);
        assert_eq!(chat.conversation().len(), 3);

        // anything else: no history change, no model call
        let outcome = chat.handle_input("maybe").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Reprompt { message: REPROMPT.to_string() });
        assert_eq!(chat.state(), TurnState::AwaitingConfirmation);
        assert_eq!(chat.conversation().len(), 3);
        assert_eq!(llm.call_count(), 1);

        let outcome = chat.handle_input("YES").await.unwrap();
        assert_eq!(
            outcome.text(),
            Some("It has ownership and borrowing.\n\nDo you want more info?")
        );
        assert_eq!(chat.state(), TurnState::AwaitingConfirmation);
        let messages = chat.conversation().messages();
        assert_eq!(messages[3].role, Role::User);
        assert_eq!(messages[3].content, MORE_INFO_REQUEST);
        assert_eq!(chat.conversation().len(), 5);

        let outcome = chat.handle_input("n").await.unwrap();
        assert_eq!(
            outcome,
            TurnOutcome::Acknowledged { message: ACKNOWLEDGEMENT.to_string() }
        );
        assert_eq!(chat.state(), TurnState::Idle);
        assert_eq!(chat.conversation().last().unwrap().content, ACKNOWLEDGEMENT);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn idle_yes_is_an_ordinary_question() {
        let llm = Arc::new(ScriptedLLM::new(vec![answer("Yes to what?")]));
        let mut chat = session(llm.clone());

        chat.handle_input("yes").await.unwrap();

        assert_eq!(chat.conversation().messages()[1].content, "yes");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let llm = Arc::new(ScriptedLLM::new(vec![]));
        let mut chat = session(llm.clone());

        assert_eq!(chat.handle_input("   ").await.unwrap(), TurnOutcome::Ignored);
        assert_eq!(chat.conversation().len(), 1);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn backend_failure_keeps_state_and_history() {
        let llm = Arc::new(ScriptedLLM::new(vec![answer("First."), backend_down()]));
        let mut chat = session(llm);

        chat.handle_input("Question").await.unwrap();
        let before = chat.conversation().len();

        let error = chat.handle_input("yes").await.unwrap_err();

        assert!(matches!(error, AgentError::BackendUnavailable(_)));
        assert_eq!(chat.state(), TurnState::AwaitingConfirmation);
        assert_eq!(chat.conversation().len(), before);
    }

    #[tokio::test]
    async fn phase_two_failure_keeps_tool_messages_and_state() {
        let llm = Arc::new(ScriptedLLM::new(vec![
            tool_request(&[("call_1", "get_current_weather", "{}")]),
            backend_down(),
        ]));
        let mut registry = ToolRegistry::new();
        registry
            .register(CountingTool::new("get_current_weather", json!({"temperature": 45.0})))
            .unwrap();
        let mut chat = ChatSession::new(llm, Arc::new(registry), AgentLoopConfig::default());

        let error = chat.handle_input("Weather?").await.unwrap_err();

        assert!(matches!(error, AgentError::BackendUnavailable(_)));
        assert_eq!(chat.state(), TurnState::Idle);
        let roles: Vec<Role> = chat.conversation().messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool]
        );
        assert!(chat.conversation().messages()[2].has_tool_calls());
        assert_eq!(
            chat.conversation().messages()[3].tool_call_id.as_deref(),
            Some("call_1")
        );
    }

    #[tokio::test]
    async fn registered_tools_are_offered_and_reported() {
        let llm = Arc::new(ScriptedLLM::new(vec![
            tool_request(&[("call_1", "get_current_weather", "{}")]),
            answer("Bring a coat."),
        ]));
        let mut registry = ToolRegistry::new();
        registry
            .register(CountingTool::new("get_current_weather", json!({"temperature": 45.0})))
            .unwrap();
        let mut chat = ChatSession::new(llm.clone(), Arc::new(registry), AgentLoopConfig::default());

        let outcome = chat.handle_input("Weather?").await.unwrap();

        match outcome {
            TurnOutcome::Answered { answer, tool_results } => {
                assert_eq!(answer, "Bring a coat.\n\nDo you want more info?");
                assert_eq!(tool_results.len(), 1);
            }
            other => panic!("expected an answer, got {other:?}"),
        }
        assert_eq!(
            llm.request(0).tool_names,
            vec!["get_current_weather".to_string()]
        );
    }

    #[tokio::test]
    async fn session_uses_configured_system_prompt() {
        let llm = Arc::new(ScriptedLLM::new(vec![answer("ok")]));
        let config = AgentLoopConfig {
            system_prompt: "You are terse.".to_string(),
            temperature: Some(0.0),
            ..AgentLoopConfig::default()
        };
        let mut chat = ChatSession::new(llm.clone(), Arc::new(ToolRegistry::new()), config);

        chat.handle_input("Hi").await.unwrap();

        let request = llm.request(0);
        assert_eq!(request.messages[0].content, "You are terse.");
        assert_eq!(request.options.temperature, Some(0.0));
    }
}
