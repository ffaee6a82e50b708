//! Demo: drive a single turn over the Server-Sent Events transport against
//! an in-process mock server.
//!
//! Run with: `cargo run --bin sse_conversation -p turnline-demos`

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use tracing_subscriber::EnvFilter;
use turnline_adapter::{ChatAdapter, ConversationStarter, EngineStarter};
use turnline_core::{EngineError, ProtocolEngine, Strategy, StrategyRequestPrep, Transport};
use wiremock::matchers::method;
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
            transport: Transport::ServerSentEvents,
        })
    }

    async fn prepare_execute_turn(&self) -> Result<StrategyRequestPrep, EngineError> {
        self.prepare_start_new_conversation().await
    }
}

fn sse_body() -> String {
    let mut body = String::new();
    for text in ["Hi there!", "How can I help?"] {
        body.push_str("event: activity\n");
        body.push_str(&format!(
            "data: {}\n\n",
            serde_json::json!({"type": "message", "text": text, "conversation": {"id": "demo-sse"}})
        ));
    }
    body.push_str("event: end\ndata: \n\n");
    body
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body()),
        )
        .mount(&server)
        .await;

    let strategy = Arc::new(FixedStrategy {
        base_url: Url::parse(&server.uri()).unwrap(),
    });
    let engine = Arc::new(ProtocolEngine::new(strategy));
    let starter: Arc<dyn ConversationStarter> = Arc::new(EngineStarter::new(engine, false));
    let adapter = ChatAdapter::new(starter);

    // The mock SSE response carries exactly two `activity` events before its
    // `end` event, so this demo stops there rather than driving the adapter
    // past the resulting handle (nothing in this demo ever calls
    // `postActivity`, so waiting past the handle would hang forever).
    adapter
        .activities()
        .take(2)
        .for_each(|activity| async move {
            println!("activity$: {:?}", activity.as_value());
        })
        .await;

    let status = adapter.connection_status().next().await.unwrap();
    println!("connection status after the turn: {status:?}");
}
