//! The polling REST turn loop.
//!
//! Drives a single logical turn as one or more `POST` exchanges against the
//! polling REST variant, yielding activities as they arrive and looping
//! while the bot reports `action: "continue"`.

use std::collections::HashMap;
use std::sync::Arc;

use futures::Stream;
use reqwest::{Client, Url};

use crate::activity::{Activity, ConversationId};
use crate::bot_response::{BotResponse, TurnAction};
use crate::error::EngineError;
use crate::retry::{with_retry, RetryConfig};
use crate::telemetry::TelemetryClient;
use crate::url::conversation_url;
use crate::ConversationIdCell;

/// Defensive cap on continuation hops within a single turn.
const MAX_TURN_ITERATIONS: u32 = 1000;

/// Drive one turn over the REST transport.
///
/// `first_body` is the fully-merged JSON body for the first hop (strategy
/// body plus `emitStartConversationEvent` or `activity`); every hop after
/// the first sends `{}`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn rest_turn_loop(
    client: Client,
    base_url: Url,
    strategy_headers: HashMap<String, String>,
    first_body: serde_json::Value,
    conversation_id: ConversationIdCell,
    retry_config: RetryConfig,
    telemetry: Arc<dyn TelemetryClient>,
) -> impl Stream<Item = Result<Activity, EngineError>> + Send + 'static {
    async_stream::try_stream! {
        let mut with_body = true;

        for _ in 0..MAX_TURN_ITERATIONS {
            let known_id = conversation_id.lock().await.clone();
            let url = conversation_url(&base_url, known_id.as_ref().map(ConversationId::as_str));
            let body = if with_body {
                first_body.clone()
            } else {
                serde_json::json!({})
            };

            let text = with_retry(retry_config, telemetry.as_ref(), || {
                let client = client.clone();
                let url = url.clone();
                let body = body.clone();
                let headers = strategy_headers.clone();
                let known_id = known_id.clone();
                async move {
                    let mut req = client
                        .post(url)
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
                        tracing::warn!(status = status.as_u16(), "rest turn loop: non-2xx response");
                        return Err(EngineError::from_status(status, body_text));
                    }
                    response.text().await.map_err(EngineError::Transport)
                }
            })
            .await?;

            let parsed: BotResponse = serde_json::from_str(&text)
                .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;

            if let Some(id) = &parsed.conversation_id {
                let mut guard = conversation_id.lock().await;
                if guard.is_none() {
                    *guard = ConversationId::new(id.clone());
                }
            }

            for activity in parsed.activities {
                yield activity;
            }

            with_body = false;
            if parsed.action == TurnAction::Waiting {
                return;
            }
        }
        tracing::warn!("rest turn loop: hit the {MAX_TURN_ITERATIONS}-iteration ceiling, terminating turn");
    }
}
