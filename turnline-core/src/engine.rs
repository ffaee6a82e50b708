//! The protocol engine.
//!
//! Owns conversation identity and dispatches each turn to the REST or
//! SSE turn loop based on what the [`Strategy`] returns for that turn.
//! The engine itself yields a raw activity stream; [`crate::handle`]
//! wraps it with the single-use "next turn" handle.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::Client;
use tokio::sync::Mutex;

use crate::activity::{Activity, ConversationId};
use crate::error::EngineError;
use crate::handle::TurnStream;
use crate::retry::RetryConfig;
use crate::rest::rest_turn_loop;
use crate::sse::sse_turn_loop;
use crate::strategy::{Strategy, StrategyRequestPrep, Transport};
use crate::telemetry::{NoopTelemetry, TelemetryClient};
use crate::ConversationIdCell;

/// Default per-request timeout applied when a [`ClientConfig`] doesn't
/// override it.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client tuning, independent of the retry/telemetry policy.
///
/// Plain struct with a [`Default`] impl and builder-style setters — the same
/// shape as `Anthropic::model`/`Anthropic::base_url` — rather than a
/// config-file-loading layer, since configuration loading is out of scope
/// for this crate.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout. `None` disables the client-level timeout and
    /// defers entirely to the underlying transport's defaults.
    pub timeout: Option<Duration>,
    /// Overrides the `User-Agent` header `reqwest` sends by default.
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            user_agent: None,
        }
    }
}

impl ClientConfig {
    /// Build the `reqwest::Client` this config describes.
    fn build(&self) -> Client {
        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        builder
            .build()
            .expect("ClientConfig only sets timeout/user-agent, which reqwest always accepts")
    }
}

/// The half-duplex protocol engine.
///
/// One mutable field (`conversation_id`) and a fixed strategy reference.
/// Not reentrant: the caller (normally [`crate::handle::TurnHandle`]
/// and, above that, the façade in `turnline-adapter`) guarantees sequential
/// use.
pub struct ProtocolEngine {
    strategy: Arc<dyn Strategy>,
    client: Client,
    retry_config: RetryConfig,
    telemetry: Arc<dyn TelemetryClient>,
    conversation_id: ConversationIdCell,
}

impl ProtocolEngine {
    /// Build a new, fresh engine — no conversation id yet.
    #[must_use]
    pub fn new(strategy: Arc<dyn Strategy>) -> Self {
        Self {
            strategy,
            client: Client::new(),
            retry_config: RetryConfig::default(),
            telemetry: Arc::new(NoopTelemetry),
            conversation_id: Arc::new(Mutex::new(None)),
        }
    }

    /// Override the retry policy (tests use [`RetryConfig::no_delay`]).
    #[must_use]
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Override the telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetryClient>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Override the underlying HTTP client (e.g. to point at a test server).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Build the underlying HTTP client from a [`ClientConfig`] instead of
    /// supplying a pre-built [`Client`] directly.
    #[must_use]
    pub fn with_client_config(self, config: ClientConfig) -> Self {
        self.with_client(config.build())
    }

    /// The conversation id adopted so far, if any.
    pub async fn conversation_id(&self) -> Option<String> {
        self.conversation_id
            .lock()
            .await
            .as_ref()
            .map(ConversationId::to_string)
    }

    /// Start a brand new conversation.
    ///
    /// Consults [`Strategy::prepare_start_new_conversation`] and merges
    /// `{ emitStartConversationEvent }` into the strategy body, then
    /// dispatches to the REST or SSE turn loop.
    pub fn start_new_conversation(
        self: &Arc<Self>,
        emit_start_conversation_event: bool,
    ) -> TurnStream {
        let engine = self.clone();
        let raw = raw_turn(move || {
            let engine = engine.clone();
            async move {
                let prep = engine.strategy.prepare_start_new_conversation().await?;
                let mut body = prep.body.clone().unwrap_or_default();
                body.insert(
                    "emitStartConversationEvent".to_string(),
                    serde_json::Value::Bool(emit_start_conversation_event),
                );
                Ok(dispatch(
                    &engine,
                    prep,
                    serde_json::Value::Object(body),
                ))
            }
        });
        TurnStream::new(self.clone(), raw)
    }

    /// Execute a user turn.
    ///
    /// Fails (on first pull) if no conversation id has been adopted yet.
    /// Consults [`Strategy::prepare_execute_turn`] and merges `{ activity }`
    /// into the strategy body, then dispatches to the REST or SSE turn loop.
    pub fn execute_turn(self: &Arc<Self>, activity: Activity) -> TurnStream {
        let engine = self.clone();
        let raw = raw_turn(move || {
            let engine = engine.clone();
            let activity = activity.clone();
            async move {
                if engine.conversation_id.lock().await.is_none() {
                    return Err(EngineError::NoConversation);
                }
                let prep = engine.strategy.prepare_execute_turn().await?;
                let mut body = prep.body.clone().unwrap_or_default();
                body.insert("activity".to_string(), activity.into_value());
                Ok(dispatch(
                    &engine,
                    prep,
                    serde_json::Value::Object(body),
                ))
            }
        });
        TurnStream::new(self.clone(), raw)
    }
}

fn dispatch(
    engine: &ProtocolEngine,
    prep: StrategyRequestPrep,
    body: serde_json::Value,
) -> impl Stream<Item = Result<Activity, EngineError>> + Send + 'static {
    let headers = prep.headers.unwrap_or_default();
    match prep.transport {
        Transport::Rest => rest_turn_loop(
            engine.client.clone(),
            prep.base_url,
            headers,
            body,
            engine.conversation_id.clone(),
            engine.retry_config,
            engine.telemetry.clone(),
        )
        .boxed(),
        Transport::ServerSentEvents => sse_turn_loop(
            engine.client.clone(),
            prep.base_url,
            headers,
            body,
            engine.conversation_id.clone(),
            engine.retry_config,
            engine.telemetry.clone(),
        )
        .boxed(),
    }
}

/// Build a lazy stream whose first poll runs `setup` (consulting the
/// strategy) to obtain the real per-transport stream, then forwards it.
///
/// This is what makes "consult the strategy once per turn, at the moment
/// the turn begins" true at the type level: nothing happens until the
/// stream is polled.
fn raw_turn<F, Fut, S>(setup: F) -> impl Stream<Item = Result<Activity, EngineError>> + Send + 'static
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<S, EngineError>> + Send,
    S: Stream<Item = Result<Activity, EngineError>> + Send + 'static,
{
    async_stream::try_stream! {
        let inner = setup().await?;
        futures::pin_mut!(inner);
        while let Some(item) = inner.next().await {
            yield item?;
        }
    }
}
