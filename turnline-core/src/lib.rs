//! `turnline-core` — a half-duplex, turn-based conversation protocol engine
//! for bot services.
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`strategy`] | Per-turn endpoint/credential/transport selection |
//! | [`retry`] | Bounded exponential retry with a short-circuit rule |
//! | [`rest`] | Polling REST turn loop |
//! | [`sse`] | Server-Sent Events turn loop |
//! | [`engine`] | Conversation identity, transport dispatch |
//! | [`handle`] | Lazy activity stream terminated by a single-use handle |
//! | [`telemetry`] | Exception-reporting port |
//! | [`test_support`] | In-memory `Strategy`/`TelemetryClient` stand-ins, behind `test-utils` |
//!
//! A turn always starts the same way: call [`ProtocolEngine::start_new_conversation`]
//! or invoke a [`handle::TurnHandle`] returned by a previous turn, then pull
//! the resulting [`handle::TurnStream`] until it yields a
//! [`handle::TurnStreamItem::Handle`] or [`handle::TurnStreamItem::Error`].

pub mod activity;
pub mod bot_response;
pub mod engine;
pub mod error;
pub mod handle;
pub mod retry;
pub mod rest;
pub mod sse;
pub mod strategy;
pub mod telemetry;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
pub mod url;

use std::sync::Arc;
use tokio::sync::Mutex;

use activity::ConversationId;

/// Shared, engine-owned conversation identity.
///
/// Cloned into both the REST and SSE turn-loop streams so either can adopt
/// the id the first time the bot reports one, and every later hop — in the
/// same turn or a later one — can read it back. Written at most once per
/// engine: once `Some`, it is never overwritten.
pub(crate) type ConversationIdCell = Arc<Mutex<Option<ConversationId>>>;

pub use activity::Activity;
pub use bot_response::{BotResponse, TurnAction};
pub use engine::{ClientConfig, ProtocolEngine};
pub use error::EngineError;
pub use handle::{TurnHandle, TurnStream, TurnStreamItem};
pub use retry::RetryConfig;
pub use strategy::{Strategy, StrategyRequestPrep, Transport};
pub use telemetry::{NoopTelemetry, TelemetryClient};
