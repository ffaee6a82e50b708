//! The chat-adapter façade.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio_stream::wrappers::WatchStream;
use turnline_core::{Activity, EngineError};
use uuid::Uuid;

use crate::connection_status::ConnectionStatus;
use crate::starter::ConversationStarter;

struct PostRequest {
    activity: Activity,
    reply: oneshot::Sender<Result<String, Arc<EngineError>>>,
}

/// Drives a [`crate::starter::ConversationStarter`] on behalf of a reactive
/// `activity$` / `connectionStatus$` / `postActivity()` consumer.
///
/// No internal thread or task spawning: all of the adapter's work
/// happens inside the [`ChatAdapter::activities`] stream, which the caller
/// must poll to make any progress at all — exactly like the engine's own
/// lazy sequences. `postActivity` calls are queued onto an internal channel
/// and drained one at a time by that same stream.
pub struct ChatAdapter {
    starter: Arc<dyn ConversationStarter>,
    // `None` once a terminal status has been sent: dropping the sender is
    // what makes every `connection_status()` subscriber's stream actually
    // complete, rather than park forever on the terminal value.
    status_tx: Mutex<Option<watch::Sender<ConnectionStatus>>>,
    status_rx: watch::Receiver<ConnectionStatus>,
    post_tx: mpsc::Sender<PostRequest>,
    post_rx: Mutex<Option<mpsc::Receiver<PostRequest>>>,
    error: Mutex<Option<Arc<EngineError>>>,
}

impl ChatAdapter {
    /// Build an adapter around `starter`. Nothing happens until
    /// [`ChatAdapter::activities`] is polled.
    #[must_use]
    pub fn new(starter: Arc<dyn ConversationStarter>) -> Self {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Uninitialized);
        let (post_tx, post_rx) = mpsc::channel(32);
        Self {
            starter,
            status_tx: Mutex::new(Some(status_tx)),
            status_rx,
            post_tx,
            post_rx: Mutex::new(Some(post_rx)),
            error: Mutex::new(None),
        }
    }

    /// `connectionStatus$` — replay-from-latest: a fresh subscriber
    /// immediately observes the current value before any future ones.
    /// Completes once a terminal value has been sent, instead of parking on
    /// it forever.
    #[must_use]
    pub fn connection_status(&self) -> WatchStream<ConnectionStatus> {
        WatchStream::new(self.status_rx.clone())
    }

    /// Send a status update, dropping the sender once it's terminal so every
    /// subscriber's stream completes instead of idling on the last value.
    async fn send_status(&self, status: ConnectionStatus) {
        let mut guard = self.status_tx.lock().await;
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(status);
        }
        if status.is_terminal() {
            *guard = None;
        }
    }

    /// The terminal error, if the adapter has already failed.
    pub async fn cached_error(&self) -> Option<Arc<EngineError>> {
        self.error.lock().await.clone()
    }

    /// Post a user activity and wait for the synthetic id acknowledging it.
    ///
    /// If the adapter has already failed, this errors immediately with the
    /// same cached error every previous and subsequent caller observes.
    pub async fn post_activity(&self, activity: Activity) -> Result<String, Arc<EngineError>> {
        if let Some(err) = self.cached_error().await {
            return Err(err);
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .post_tx
            .send(PostRequest {
                activity,
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            // The activities() stream has already terminated without ever
            // recording a cached error (e.g. it was never polled).
            return Err(Arc::new(EngineError::NoConversation));
        }
        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(self
                .cached_error()
                .await
                .unwrap_or_else(|| Arc::new(EngineError::NoConversation))),
        }
    }

    /// `activity$` — every activity yielded across every turn, in order.
    ///
    /// Must be polled by exactly one consumer for the lifetime of the
    /// adapter; it is what actually drives the start callable, the turn
    /// loop, and the `postActivity` queue. Panics if polled more than once
    /// (mirrors the source's "one subscriber drives the engine" shape — a
    /// second concurrent subscriber would race the same queue).
    pub fn activities(&self) -> impl Stream<Item = Activity> + '_ {
        async_stream::stream! {
            self.send_status(ConnectionStatus::Connecting).await;

            let mut post_rx = self
                .post_rx
                .lock()
                .await
                .take()
                .expect("ChatAdapter::activities() must only be polled once");

            let started = match self.starter.start().await {
                Ok(started) => started,
                Err(err) => {
                    self.fail(err).await;
                    return;
                }
            };

            self.send_status(ConnectionStatus::Online).await;

            let mut turn = started.initial_activities;
            let execute = started.execute;

            loop {
                match turn.next().await {
                    turnline_core::TurnStreamItem::Activity(activity) => {
                        yield activity;
                    }
                    turnline_core::TurnStreamItem::Error(err) => {
                        self.fail(err).await;
                        return;
                    }
                    turnline_core::TurnStreamItem::Handle(_handle) => {
                        match post_rx.recv().await {
                            Some(request) => match execute(request.activity).await {
                                Ok(next_turn) => {
                                    turn = next_turn;
                                    let _ = request.reply.send(Ok(Uuid::new_v4().to_string()));
                                }
                                Err(err) => {
                                    let shared = Arc::new(err);
                                    let _ = request.reply.send(Err(shared.clone()));
                                    self.fail_shared(shared).await;
                                    return;
                                }
                            },
                            None => {
                                // The adapter was dropped; end cleanly.
                                self.send_status(ConnectionStatus::Ended).await;
                                return;
                            }
                        }
                    }
                }
            }
        }
    }

    async fn fail(&self, err: EngineError) {
        self.fail_shared(Arc::new(err)).await;
    }

    async fn fail_shared(&self, err: Arc<EngineError>) {
        let mut guard = self.error.lock().await;
        if guard.is_some() {
            return;
        }
        *guard = Some(err);
        self.send_status(ConnectionStatus::FailedToConnect).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starter::ConversationStart;
    use async_trait::async_trait;
    use futures::StreamExt;
    use turnline_core::test_support::FixedStrategy;
    use turnline_core::{ProtocolEngine, TurnStream};

    struct FailingStarter;

    fn artificial_error() -> EngineError {
        EngineError::InvalidResponse("artificial".to_string())
    }

    #[async_trait]
    impl ConversationStarter for FailingStarter {
        async fn start(&self) -> Result<ConversationStart, EngineError> {
            Err(artificial_error())
        }
    }

    #[tokio::test]
    async fn synchronous_start_failure_fails_the_adapter() {
        let adapter = ChatAdapter::new(Arc::new(FailingStarter));
        let activities: Vec<_> = adapter.activities().collect().await;
        assert!(activities.is_empty());
        assert_eq!(
            adapter.connection_status().next().await,
            Some(ConnectionStatus::FailedToConnect)
        );
        assert!(adapter.cached_error().await.is_some());
    }

    #[tokio::test]
    async fn connection_status_completes_after_failure() {
        let adapter = ChatAdapter::new(Arc::new(FailingStarter));
        let _: Vec<_> = adapter.activities().collect().await;

        // Subscribing after the adapter already failed must still replay the
        // terminal value once, then complete — not park on it forever.
        let statuses: Vec<_> = adapter.connection_status().collect().await;
        assert_eq!(statuses, vec![ConnectionStatus::FailedToConnect]);
    }

    #[tokio::test]
    async fn post_activity_after_failure_reuses_cached_error() {
        let adapter = ChatAdapter::new(Arc::new(FailingStarter));
        let _: Vec<_> = adapter.activities().collect().await;

        let first = adapter
            .post_activity(Activity::new(serde_json::json!({"type": "message"})))
            .await;
        let second = adapter
            .post_activity(Activity::new(serde_json::json!({"type": "message"})))
            .await;
        assert!(first.is_err());
        assert!(second.is_err());
        assert!(Arc::ptr_eq(&first.unwrap_err(), &second.unwrap_err()));
    }

    struct EmptyTurnStarter {
        engine: Arc<ProtocolEngine>,
    }

    #[async_trait]
    impl ConversationStarter for EmptyTurnStarter {
        async fn start(&self) -> Result<ConversationStart, EngineError> {
            let initial_activities: TurnStream = self.engine.start_new_conversation(true);
            let engine = self.engine.clone();
            Ok(ConversationStart {
                initial_activities,
                execute: Arc::new(move |activity| {
                    let engine = engine.clone();
                    Box::pin(async move { Ok(engine.execute_turn(activity)) })
                }),
            })
        }
    }

    #[tokio::test]
    async fn connection_status_replays_latest_to_new_subscribers() {
        let engine = Arc::new(ProtocolEngine::new(Arc::new(FixedStrategy::unused())));
        let adapter = ChatAdapter::new(Arc::new(EmptyTurnStarter { engine }));
        let mut status = adapter.connection_status();
        assert_eq!(status.next().await, Some(ConnectionStatus::Uninitialized));
    }
}
