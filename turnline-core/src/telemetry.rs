//! Telemetry port — a narrow capability for reporting handled exceptions.

use crate::error::EngineError;

/// Reports exceptions the engine has already handled (e.g. retry
/// exhaustion). Absence is acceptable: [`NoopTelemetry`] disables
/// reporting entirely.
pub trait TelemetryClient: Send + Sync {
    /// Called once the retry policy gives up on an operation.
    ///
    /// `handled_at` and `retry_count` are passed through verbatim to match
    /// the wire shape `trackException({ error }, { handledAt, retryCount })`
    /// expected by existing telemetry backends.
    fn track_exception(&self, error: &EngineError, handled_at: &str, retry_count: u8);
}

/// A [`TelemetryClient`] that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetryClient for NoopTelemetry {
    fn track_exception(&self, _error: &EngineError, _handled_at: &str, _retry_count: u8) {}
}
