use futures::StreamExt;
use tokio::sync::mpsc;

use agent_core::tools::{ToolCall, ToolCallAccumulator};
use agent_core::{AgentError, AgentEvent};
use agent_llm::{LLMChunk, LLMStream};

pub struct StreamHandlingOutput {
    pub content: String,
    pub token_count: usize,
    pub tool_calls: Vec<ToolCall>,
}

/// Drain one model response, forwarding text tokens as they arrive.
///
/// Tool-call fragments are merged by stream index. A stream error aborts the
/// response and is returned as a backend failure.
pub async fn consume_llm_stream(
    mut stream: LLMStream,
    event_tx: Option<&mpsc::Sender<AgentEvent>>,
    session_id: &str,
) -> Result<StreamHandlingOutput, AgentError> {
    let mut content = String::new();
    let mut token_count = 0usize;
    let mut tool_calls = ToolCallAccumulator::new();

    while let Some(chunk_result) = stream.next().await {
        match chunk_result {
            Ok(LLMChunk::Token(token)) => {
                if token.is_empty() {
                    continue;
                }
                token_count += token.len();
                content.push_str(&token);

                if let Some(event_tx) = event_tx {
                    let _ = event_tx
                        .send(AgentEvent::Token {
                            content: token.clone(),
                        })
                        .await;
                }
            }
            Ok(LLMChunk::ToolCalls(partial_calls)) => {
                log::debug!(
                    "[{}] Received {} tool call parts",
                    session_id,
                    partial_calls.len()
                );
                tool_calls.extend(partial_calls);
            }
            Ok(LLMChunk::Done) => {
                log::debug!("[{}] LLM stream completed", session_id);
            }
            Err(error) => {
                log::warn!("[{}] LLM stream failed: {}", session_id, error);
                return Err(error.into());
            }
        }
    }

    Ok(StreamHandlingOutput {
        content,
        token_count,
        tool_calls: tool_calls.finalize(),
    })
}
