//! Demo: drive a full conversation over the polling REST transport against
//! an in-process mock server, printing every activity and connection status
//! transition as it happens.
//!
//! Run with: `cargo run --bin rest_conversation -p turnline-demos`

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use tracing_subscriber::EnvFilter;
use turnline_adapter::{ChatAdapter, ConversationStarter, EngineStarter};
use turnline_core::{EngineError, ProtocolEngine, Strategy, StrategyRequestPrep, Transport};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FixedStrategy {
    base_url: Url,
}

#[async_trait]
impl Strategy for FixedStrategy {
    async fn prepare_start_new_conversation(&self) -> Result<StrategyRequestPrep, EngineError> {
        Ok(StrategyRequestPrep {
            base_url: self.base_url.clone(),
            body: None,
            headers: None,
            transport: Transport::Rest,
        })
    }

    async fn prepare_execute_turn(&self) -> Result<StrategyRequestPrep, EngineError> {
        self.prepare_start_new_conversation().await
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex("^/conversations/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "action": "waiting",
            "activities": [{"type": "message", "text": "Hello from the bot!"}],
            "conversationId": "demo-conversation",
        })))
        .mount(&server)
        .await;

    let strategy = Arc::new(FixedStrategy {
        base_url: Url::parse(&server.uri()).unwrap(),
    });
    let engine = Arc::new(ProtocolEngine::new(strategy));
    let starter: Arc<dyn ConversationStarter> = Arc::new(EngineStarter::new(engine, true));
    let adapter = Arc::new(ChatAdapter::new(starter));

    let mut statuses = adapter.connection_status();
    let status_task = tokio::spawn(async move {
        while let Some(status) = statuses.next().await {
            println!("connectionStatus$: {status:?}");
            if status.is_terminal() {
                break;
            }
        }
    });

    // The mock server answers `waiting` on its very first hop, so the turn
    // stream yields exactly one activity before producing its terminal
    // handle — this demo never posts a follow-up turn, so it only needs to
    // observe that one activity rather than drive the adapter to
    // completion (which would otherwise wait forever for a `postActivity`
    // that never comes).
    adapter
        .activities()
        .take(1)
        .for_each(|activity| async move {
            println!("activity$: {:?}", activity.as_value());
        })
        .await;

    status_task.abort();
}
