//! In-memory implementations for testing.
//!
//! Available behind the `test-utils` feature flag, mirroring the layout of
//! `layer0::test_utils` — minimal stand-ins that prove the trait APIs are
//! usable without any real HTTP endpoint.

use async_trait::async_trait;
use reqwest::Url;

use crate::error::EngineError;
use crate::strategy::{Strategy, StrategyRequestPrep, Transport};
use crate::telemetry::TelemetryClient;

/// A [`Strategy`] that always resolves to the same `base_url` and transport,
/// with no static body or headers.
///
/// Useful for tests that only care about the engine/turn-loop machinery and
/// not about what a real strategy would compute per turn.
#[derive(Debug, Clone)]
pub struct FixedStrategy {
    base_url: Url,
    transport: Transport,
}

impl FixedStrategy {
    /// Build a strategy that always dispatches to `base_url` over `transport`.
    #[must_use]
    pub fn new(base_url: Url, transport: Transport) -> Self {
        Self { base_url, transport }
    }

    /// A strategy pointing at `http://unused/` over the REST transport, for
    /// tests that never expect a request to actually go out.
    #[must_use]
    pub fn unused() -> Self {
        Self::new(Url::parse("http://unused/").expect("static URL parses"), Transport::Rest)
    }
}

#[async_trait]
impl Strategy for FixedStrategy {
    async fn prepare_start_new_conversation(&self) -> Result<StrategyRequestPrep, EngineError> {
        Ok(StrategyRequestPrep {
            base_url: self.base_url.clone(),
            body: None,
            headers: None,
            transport: self.transport,
        })
    }

    async fn prepare_execute_turn(&self) -> Result<StrategyRequestPrep, EngineError> {
        self.prepare_start_new_conversation().await
    }
}

/// A [`TelemetryClient`] that records every call it receives, for tests that
/// need to assert telemetry actually fired instead of just ignoring it.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    calls: std::sync::Mutex<Vec<(String, String, u8)>>,
}

impl RecordingTelemetry {
    /// Build an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of `(error message, handled_at, retry_count)` for every call
    /// made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, String, u8)> {
        self.calls.lock().expect("telemetry mutex poisoned").clone()
    }
}

impl TelemetryClient for RecordingTelemetry {
    fn track_exception(&self, error: &EngineError, handled_at: &str, retry_count: u8) {
        self.calls
            .lock()
            .expect("telemetry mutex poisoned")
            .push((error.to_string(), handled_at.to_string(), retry_count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_strategy_returns_the_same_prep_for_both_directions() {
        let strategy = FixedStrategy::unused();
        let start = strategy.prepare_start_new_conversation().await.unwrap();
        let execute = strategy.prepare_execute_turn().await.unwrap();
        assert_eq!(start.base_url, execute.base_url);
        assert_eq!(start.transport, execute.transport);
    }

    #[test]
    fn recording_telemetry_accumulates_calls_in_order() {
        let telemetry = RecordingTelemetry::new();
        telemetry.track_exception(&EngineError::EmptyBody, "withRetries", 3);
        telemetry.track_exception(&EngineError::WrongContentType, "withRetries", 5);
        let calls = telemetry.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].2, 3);
        assert_eq!(calls[1].2, 5);
    }
}
