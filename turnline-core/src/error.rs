//! The engine's error taxonomy.
//!
//! Every failure the protocol can produce collapses into one
//! [`EngineError`] so callers (and the façade in `turnline-adapter`) have a
//! single type to match on. [`EngineError::is_retryable`] is consulted by
//! [`crate::retry`] to decide whether another attempt is worth making.

use thiserror::Error;

/// Errors produced while driving the half-duplex protocol.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EngineError {
    /// The HTTP transport itself failed (connect, TLS, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server responded with a non-2xx status.
    ///
    /// Retryable iff `status >= 500`; 4xx statuses short-circuit the retry loop.
    #[error("server returned {status}")]
    Status {
        /// The HTTP status code returned by the server.
        status: u16,
        /// Response body, if any was read before the error was raised.
        body: String,
    },

    /// The response body did not parse as the expected shape.
    #[error("invalid response body: {0}")]
    InvalidResponse(String),

    /// A 2xx SSE response did not carry a `text/event-stream` content type.
    #[error("server did not respond with content type of text/event-stream")]
    WrongContentType,

    /// A 2xx SSE response had an empty body.
    #[error("server did not respond with body.")]
    EmptyBody,

    /// `executeTurn` was called before `startNewConversation`.
    #[error("startNewConversation() must be called before executeTurn().")]
    NoConversation,

    /// A [`crate::handle::TurnHandle`] was invoked a second time.
    #[error("This executeTurn() function is obsoleted. Please use a new one.")]
    HandleObsoleted,

    /// Retry budget was exhausted while the last attempt was still
    /// retryable (i.e. every attempt failed with a transport/5xx error).
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Number of attempts made, including the first.
        attempts: u8,
        /// The error from the final attempt.
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Whether retrying the operation that produced this error might
    /// succeed.
    ///
    /// Mirrors `neuron-turn::ProviderError::is_retryable` — transport
    /// errors and `>=500` statuses are retryable, everything else is
    /// considered a fatal, non-retryable outcome for the current turn.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Transport(_) => true,
            EngineError::Status { status, .. } => *status >= 500,
            EngineError::InvalidResponse(_)
            | EngineError::WrongContentType
            | EngineError::EmptyBody
            | EngineError::NoConversation
            | EngineError::HandleObsoleted
            | EngineError::RetriesExhausted { .. } => false,
        }
    }

    /// Build a [`EngineError::Status`] from an HTTP response status and body.
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        EngineError::Status {
            status: status.as_u16(),
            body,
        }
    }
}
