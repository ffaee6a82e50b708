//! The `{ execute, initialActivities }` port that couples the façade to the
//! protocol engine.
//!
//! Modeling this as a trait, rather than having [`crate::ChatAdapter`] hold a
//! `turnline_core::ProtocolEngine` directly, lets the façade depend on a
//! minimal interface that can be unit-tested with a hand-written stub.
//! [`EngineStarter`] is the real implementation; tests substitute their own.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use turnline_core::{Activity, EngineError, ProtocolEngine, TurnStream};

/// A boxed `async fn(Activity) -> Result<TurnStream, EngineError>`.
///
/// Boxed because the façade stores it across `.await` points alongside a
/// `TurnStream` it doesn't otherwise own a concrete type for.
pub type ExecuteFn = Arc<
    dyn Fn(Activity) -> Pin<Box<dyn Future<Output = Result<TurnStream, EngineError>> + Send>>
        + Send
        + Sync,
>;

/// What the single asynchronous "start conversation" callable returns.
pub struct ConversationStart {
    /// The first turn's activity stream.
    pub initial_activities: TurnStream,
    /// How to execute every subsequent turn.
    pub execute: ExecuteFn,
}

/// The "start conversation" port.
///
/// Consulted exactly once per [`crate::ChatAdapter`] instance, on first
/// subscription to `activity$`.
#[async_trait]
pub trait ConversationStarter: Send + Sync {
    /// Start a brand new conversation, returning both the first turn's
    /// activities and the means to execute every turn after it.
    async fn start(&self) -> Result<ConversationStart, EngineError>;
}

/// The production [`ConversationStarter`]: wraps a [`ProtocolEngine`].
pub struct EngineStarter {
    engine: Arc<ProtocolEngine>,
    emit_start_conversation_event: bool,
}

impl EngineStarter {
    /// Build a starter around `engine`, passing `emit_start_conversation_event`
    /// through to `startNewConversation`.
    #[must_use]
    pub fn new(engine: Arc<ProtocolEngine>, emit_start_conversation_event: bool) -> Self {
        Self {
            engine,
            emit_start_conversation_event,
        }
    }
}

#[async_trait]
impl ConversationStarter for EngineStarter {
    async fn start(&self) -> Result<ConversationStart, EngineError> {
        let initial_activities = self.engine.start_new_conversation(self.emit_start_conversation_event);
        let engine = self.engine.clone();
        let execute: ExecuteFn = Arc::new(move |activity| {
            let engine = engine.clone();
            Box::pin(async move { Ok(engine.execute_turn(activity)) })
        });
        Ok(ConversationStart {
            initial_activities,
            execute,
        })
    }
}
