use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use turnline_adapter::{ChatAdapter, ConnectionStatus, ConversationStart, ConversationStarter, ExecuteFn};
use turnline_core::test_support::FixedStrategy;
use turnline_core::{Activity, EngineError, ProtocolEngine, Transport};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// --- S3: execute() throwing synchronously fails the adapter ---

/// A starter whose `initial_activities` immediately yields a handle (a real
/// conversation over a mock server that reports `"waiting"` on the first
/// hop) and whose `execute` always fails synchronously, without ever
/// consulting the engine. This is what exercises the `facade`'s
/// `execute`-throws branch, as opposed to a starter that fails in `start()`
/// itself.
struct ExecuteFailsStarter {
    engine: Arc<ProtocolEngine>,
}

fn artificial_error() -> EngineError {
    EngineError::InvalidResponse("artificial".to_string())
}

#[async_trait]
impl ConversationStarter for ExecuteFailsStarter {
    async fn start(&self) -> Result<ConversationStart, EngineError> {
        // Give the concurrently-polling `connection_status()` subscriber a
        // genuine scheduling point before the first status update, so it
        // observes every intermediate value instead of racing straight past
        // it the way a synchronous resolution could.
        tokio::task::yield_now().await;
        let initial_activities = self.engine.start_new_conversation(true);
        let execute: ExecuteFn = Arc::new(|_activity| Box::pin(async move { Err(artificial_error()) }));
        Ok(ConversationStart {
            initial_activities,
            execute,
        })
    }
}

#[tokio::test]
async fn s3_execute_throwing_synchronously_fails_the_adapter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "action": "waiting",
            "activities": [],
            "conversationId": "c-00001",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let strategy = FixedStrategy::new(
        reqwest::Url::parse(&server.uri()).expect("wiremock URI parses"),
        Transport::Rest,
    );
    let engine = Arc::new(ProtocolEngine::new(Arc::new(strategy)));
    let adapter = ChatAdapter::new(Arc::new(ExecuteFailsStarter { engine }));

    // `connection_status()` is push-based: a subscriber that isn't actively
    // polling while the adapter is driven can only ever observe the latest
    // value (a fresh subscriber always replays the current value first), not
    // every intermediate one. Poll it concurrently with driving `activities()`
    // and posting the activity that triggers `execute`'s synchronous failure,
    // the way a real subscriber races production — no `.take()`, since the
    // point of this scenario is that the stream actually completes on its own.
    let statuses = adapter.connection_status().collect::<Vec<_>>();
    let activities = adapter.activities().collect::<Vec<Activity>>();
    let post = async {
        // Give `activities()` a chance to reach the post-initial-turn handle
        // and start waiting on the post queue before this arrives.
        tokio::task::yield_now().await;
        adapter
            .post_activity(Activity::new(serde_json::json!({"text": "Aloha!", "type": "message"})))
            .await
    };
    let (statuses, activities, post) = tokio::join!(statuses, activities, post);

    assert!(activities.is_empty());
    assert_eq!(
        statuses,
        vec![
            ConnectionStatus::Uninitialized,
            ConnectionStatus::Connecting,
            ConnectionStatus::Online,
            ConnectionStatus::FailedToConnect,
        ]
    );

    let first_err = post.expect_err("post_activity must fail once execute() throws");
    assert!(first_err.to_string().contains("artificial"));

    let second = adapter
        .post_activity(Activity::new(serde_json::json!({"text": "Aloha!", "type": "message"})))
        .await;
    let second_err = second.expect_err("second post_activity must also fail");
    assert!(Arc::ptr_eq(&first_err, &second_err));
}
