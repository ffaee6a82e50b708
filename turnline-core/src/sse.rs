//! The Server-Sent Events turn reader.
//!
//! Drives a single logical turn over one streaming HTTP response, parsing a
//! hand-rolled `text/event-stream` body the same way
//! `neuron-provider-anthropic::streaming` parses Anthropic's SSE stream:
//! accumulate `event:`/`data:` lines until a blank line, then dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use reqwest::{Client, Url};

use crate::activity::{Activity, ConversationId};
use crate::error::EngineError;
use crate::retry::{with_retry, RetryConfig};
use crate::telemetry::TelemetryClient;
use crate::url::conversation_url;
use crate::ConversationIdCell;

const SSE_CONTENT_TYPE_PREFIX: &str = "text/event-stream";

/// Drive one turn over the SSE transport.
#[allow(clippy::too_many_arguments)]
pub(crate) fn sse_turn_loop(
    client: Client,
    base_url: Url,
    strategy_headers: HashMap<String, String>,
    body: serde_json::Value,
    conversation_id: ConversationIdCell,
    retry_config: RetryConfig,
    telemetry: Arc<dyn TelemetryClient>,
) -> impl Stream<Item = Result<Activity, EngineError>> + Send + 'static {
    async_stream::try_stream! {
        let known_id = conversation_id.lock().await.clone();
        let url = conversation_url(&base_url, known_id.as_ref().map(ConversationId::as_str));

        let response = with_retry(retry_config, telemetry.as_ref(), || {
            let client = client.clone();
            let url = url.clone();
            let body = body.clone();
            let headers = strategy_headers.clone();
            let known_id = known_id.clone();
            async move {
                let mut req = client
                    .post(url)
                    .header("accept", "text/event-stream")
                    .header("content-type", "application/json");
                for (key, value) in &headers {
                    req = req.header(key.as_str(), value.as_str());
                }
                if let Some(id) = &known_id {
                    req = req.header("x-ms-conversationid", id.as_str());
                }
                let response = req.json(&body).send().await.map_err(EngineError::Transport)?;
                let status = response.status();
                if !status.is_success() {
                    let body_text = response.text().await.unwrap_or_default();
                    tracing::warn!(status = status.as_u16(), "sse turn loop: non-2xx response");
                    return Err(EngineError::from_status(status, body_text));
                }

                let content_type = response
                    .headers()
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if !content_type.starts_with(SSE_CONTENT_TYPE_PREFIX) {
                    // Not retried: the short-circuit rule fires because this
                    // maps to a < 500 style failure in all but name.
                    return Err(EngineError::WrongContentType);
                }

                Ok(response)
            }
        })
        .await?;

        let mut state = SseParserState::new();
        let mut byte_stream = response.bytes_stream();
        let mut line_buf = String::new();
        let mut saw_any_bytes = false;
        let mut ended = false;

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk: bytes::Bytes = chunk_result.map_err(EngineError::Transport)?;
            if chunk.is_empty() {
                continue;
            }
            saw_any_bytes = true;
            let chunk_str = std::str::from_utf8(&chunk)
                .map_err(|e| EngineError::InvalidResponse(format!("UTF-8 decode error: {e}")))?;
            line_buf.push_str(chunk_str);

            while let Some(newline_pos) = line_buf.find('\n') {
                let line = line_buf[..newline_pos].trim_end_matches('\r').to_string();
                line_buf.drain(..=newline_pos);

                match state.process_line(&line)? {
                    LineOutcome::Activity(activity) => {
                        if conversation_id.lock().await.is_none() {
                            if let Some(id) = activity.conversation_id() {
                                let mut guard = conversation_id.lock().await;
                                if guard.is_none() {
                                    *guard = ConversationId::new(id.to_string());
                                }
                            }
                        }
                        yield activity;
                    }
                    LineOutcome::End => {
                        ended = true;
                    }
                    LineOutcome::None => {}
                }
                if ended {
                    break;
                }
            }
            if ended {
                break;
            }
        }

        if !saw_any_bytes {
            Err(EngineError::EmptyBody)?;
        }
        // A premature end-of-stream without an `end` event terminates the
        // turn cleanly rather than erroring.
    }
}

/// What one fully-dispatched SSE event produced.
enum LineOutcome {
    Activity(Activity),
    End,
    None,
}

/// Tracks in-progress `event:`/`data:` accumulation across chunk boundaries.
struct SseParserState {
    current_event_type: Option<String>,
    current_data: String,
}

impl SseParserState {
    fn new() -> Self {
        Self {
            current_event_type: None,
            current_data: String::new(),
        }
    }

    fn process_line(&mut self, line: &str) -> Result<LineOutcome, EngineError> {
        if line.is_empty() {
            return self.dispatch_event();
        }
        if let Some(event_type) = line.strip_prefix("event:") {
            self.current_event_type = Some(event_type.trim().to_string());
        } else if let Some(data) = line.strip_prefix("data:") {
            if !self.current_data.is_empty() {
                self.current_data.push('\n');
            }
            self.current_data.push_str(data.trim());
        }
        // Comment lines (starting with ':') and unknown prefixes are ignored.
        Ok(LineOutcome::None)
    }

    fn dispatch_event(&mut self) -> Result<LineOutcome, EngineError> {
        let event_type = match self.current_event_type.take() {
            Some(t) => t,
            None => {
                self.current_data.clear();
                return Ok(LineOutcome::None);
            }
        };
        let data = std::mem::take(&mut self.current_data);

        match event_type.as_str() {
            "activity" => {
                let value: serde_json::Value = serde_json::from_str(&data)
                    .map_err(|e| EngineError::InvalidResponse(format!("invalid activity JSON in SSE: {e}")))?;
                Ok(LineOutcome::Activity(Activity::new(value)))
            }
            "end" => Ok(LineOutcome::End),
            // Any other event name is ignored.
            _ => Ok(LineOutcome::None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cell() -> ConversationIdCell {
        Arc::new(Mutex::new(None))
    }

    fn sse_body() -> String {
        let mut body = String::new();
        body.push_str("event: activity\n");
        body.push_str(&format!(
            "data: {}\n\n",
            serde_json::json!({"type": "message", "text": "Hello, World!", "conversation": {"id": "c-00001"}})
        ));
        body.push_str("event: activity\n");
        body.push_str(&format!(
            "data: {}\n\n",
            serde_json::json!({"type": "message", "text": "Aloha!"})
        ));
        body.push_str("event: activity\n");
        body.push_str(&format!(
            "data: {}\n\n",
            serde_json::json!({"type": "message", "text": "您好！"})
        ));
        body.push_str("event: end\n");
        body.push_str("data: \n\n");
        body
    }

    #[tokio::test]
    async fn three_activities_then_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let base_url = Url::parse(&server.uri()).unwrap();
        let conv_id = cell();
        let stream = sse_turn_loop(
            Client::new(),
            base_url,
            HashMap::new(),
            serde_json::json!({}),
            conv_id.clone(),
            RetryConfig::no_delay(),
            Arc::new(crate::telemetry::NoopTelemetry),
        );
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(Result::is_ok));
        assert_eq!(conv_id.lock().await.as_ref().unwrap().as_str(), "c-00001");
    }

    #[tokio::test]
    async fn wrong_content_type_fails_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string("{}"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let base_url = Url::parse(&server.uri()).unwrap();
        let stream = sse_turn_loop(
            Client::new(),
            base_url,
            HashMap::new(),
            serde_json::json!({}),
            cell(),
            RetryConfig::no_delay(),
            Arc::new(crate::telemetry::NoopTelemetry),
        );
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(EngineError::WrongContentType)));
    }

    #[tokio::test]
    async fn premature_end_of_stream_terminates_cleanly() {
        let server = MockServer::start().await;
        let mut partial = String::new();
        partial.push_str("event: activity\n");
        partial.push_str(&format!(
            "data: {}\n\n",
            serde_json::json!({"type": "message", "text": "only one"})
        ));
        Mock::given(method("POST"))
            .and(path("/conversations/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream; charset=utf-8")
                    .set_body_string(partial),
            )
            .expect(1)
            .mount(&server)
            .await;

        let base_url = Url::parse(&server.uri()).unwrap();
        let stream = sse_turn_loop(
            Client::new(),
            base_url,
            HashMap::new(),
            serde_json::json!({}),
            cell(),
            RetryConfig::no_delay(),
            Arc::new(crate::telemetry::NoopTelemetry),
        );
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_ok());
    }
}
