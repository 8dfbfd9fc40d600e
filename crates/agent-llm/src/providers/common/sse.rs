//! Shared SSE -> [`LLMStream`] adapter.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Response;

use crate::provider::{LLMError, LLMStream, Result};
use crate::types::LLMChunk;

fn to_stream_error(err: LLMError) -> LLMError {
    match err {
        LLMError::Stream(msg) => LLMError::Stream(msg),
        other => LLMError::Stream(other.to_string()),
    }
}

/// Convert an SSE HTTP [`Response`] into an [`LLMStream`].
///
/// `handler` receives the data payload of each event, and can either:
/// - return `Ok(chunks)` to emit zero or more chunks in order
/// - return `Err(_)` to emit a stream error (mapped to `LLMError::Stream`)
pub fn llm_stream_from_sse<H>(response: Response, mut handler: H) -> LLMStream
where
    H: FnMut(&str) -> Result<Vec<LLMChunk>> + Send + 'static,
{
    let stream = response
        .bytes_stream()
        .eventsource()
        .map(move |event| {
            let event = event.map_err(|e| LLMError::Stream(e.to_string()))?;
            handler(event.data.as_str()).map_err(to_stream_error)
        })
        .flat_map(|result| {
            let items: Vec<Result<LLMChunk>> = match result {
                Ok(chunks) => chunks.into_iter().map(Ok).collect(),
                Err(err) => vec![Err(err)],
            };
            futures_util::stream::iter(items)
        });

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn sse_response(body: &'static str) -> (MockServer, Response) {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&mock_server)
            .await;

        let response = reqwest::Client::new()
            .get(format!("{}/sse", mock_server.uri()))
            .send()
            .await
            .expect("response");

        (mock_server, response)
    }

    #[tokio::test]
    async fn filters_skipped_events() {
        let (_server, response) =
            sse_response(concat!("data: hello\n", "\n", "data: skip\n", "\n")).await;

        let mut stream = llm_stream_from_sse(response, |data| {
            if data == "skip" {
                return Ok(Vec::new());
            }
            Ok(vec![LLMChunk::Token(data.to_string())])
        });

        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.expect("chunk"));
        }

        assert_eq!(out, vec![LLMChunk::Token("hello".to_string())]);
    }

    #[tokio::test]
    async fn one_event_can_emit_several_chunks() {
        let (_server, response) = sse_response(concat!("data: a b\n", "\n", "data: c\n", "\n")).await;

        let mut stream = llm_stream_from_sse(response, |data| {
            Ok(data
                .split(' ')
                .map(|word| LLMChunk::Token(word.to_string()))
                .collect())
        });

        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.expect("chunk"));
        }

        assert_eq!(
            out,
            vec![
                LLMChunk::Token("a".to_string()),
                LLMChunk::Token("b".to_string()),
                LLMChunk::Token("c".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn maps_handler_errors_to_stream_error() {
        let (_server, response) = sse_response(concat!("data: boom\n", "\n")).await;

        let mut stream =
            llm_stream_from_sse(response, |_data| Err(LLMError::Api("boom".to_string())));

        let Some(item) = stream.next().await else {
            panic!("expected one stream item");
        };

        match item {
            Ok(chunk) => panic!("expected error, got chunk: {chunk:?}"),
            Err(LLMError::Stream(msg)) => assert!(msg.contains("API error")),
            Err(other) => panic!("expected LLMError::Stream, got: {other:?}"),
        }
    }
}
