//! The turn-generator wrapper.
//!
//! Wraps each engine-produced activity stream so that, once exhausted, it
//! yields a single-use "next turn" handle as its terminal value. `futures::Stream`
//! has no slot for a generator's return value, so [`TurnStream`] is an
//! explicit pull-based state machine rather than an implementation of
//! [`futures::Stream`] itself.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{Stream, StreamExt};

use crate::activity::Activity;
use crate::engine::ProtocolEngine;
use crate::error::EngineError;

type BoxActivityStream = Pin<Box<dyn Stream<Item = Result<Activity, EngineError>> + Send>>;

/// One pull from a [`TurnStream`].
#[derive(Debug)]
pub enum TurnStreamItem {
    /// The next activity produced by the bot this turn.
    Activity(Activity),
    /// The turn failed; no further pulls will produce activities and no
    /// handle will be produced for this turn.
    Error(EngineError),
    /// The turn ended cleanly. This is the terminal value: a single-use
    /// capability to start the next turn.
    Handle(TurnHandle),
}

/// A lazy, pull-based activity sequence for one turn, terminated by a
/// [`TurnHandle`].
pub struct TurnStream {
    inner: BoxActivityStream,
    engine: Arc<ProtocolEngine>,
    finished: bool,
    // Set on the first terminal pull and reused on every later one, so that
    // pulling a drained stream repeatedly never mints more than one
    // non-obsoleted handle for this turn.
    handle: Option<TurnHandle>,
}

impl TurnStream {
    pub(crate) fn new(
        engine: Arc<ProtocolEngine>,
        inner: impl Stream<Item = Result<Activity, EngineError>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(inner),
            engine,
            finished: false,
            handle: None,
        }
    }

    fn handle(&mut self) -> TurnHandle {
        self.handle
            .get_or_insert_with(|| TurnHandle::new(self.engine.clone()))
            .clone()
    }

    /// Pull the next item: an activity, a turn-ending error, or — once the
    /// bot-produced activities are exhausted — the handle for the next turn.
    pub async fn next(&mut self) -> TurnStreamItem {
        if self.finished {
            return TurnStreamItem::Handle(self.handle());
        }
        match self.inner.next().await {
            Some(Ok(activity)) => TurnStreamItem::Activity(activity),
            Some(Err(err)) => {
                self.finished = true;
                TurnStreamItem::Error(err)
            }
            None => {
                self.finished = true;
                TurnStreamItem::Handle(self.handle())
            }
        }
    }
}

/// A single-use capability to initiate the next user turn.
///
/// Invoking it twice is a protocol error: the second call rejects with
/// [`EngineError::HandleObsoleted`]. `&self` rather than `self` so a handle
/// can be invoked from a shared reference the way a caller that merely holds
/// a callable (not an owned, move-only value) would in the source protocol —
/// the obsoletion flag, not Rust's move semantics, is what enforces
/// single-use here.
#[derive(Clone)]
pub struct TurnHandle {
    engine: Arc<ProtocolEngine>,
    obsoleted: Arc<AtomicBool>,
}

impl std::fmt::Debug for TurnHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnHandle")
            .field("obsoleted", &self.obsoleted.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl TurnHandle {
    pub(crate) fn new(engine: Arc<ProtocolEngine>) -> Self {
        Self {
            engine,
            obsoleted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Post a user activity, obtaining the next turn's [`TurnStream`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::HandleObsoleted`] if this handle (or a clone
    /// of it) has already been invoked once.
    pub fn execute(&self, activity: Activity) -> Result<TurnStream, EngineError> {
        if self.obsoleted.swap(true, Ordering::SeqCst) {
            return Err(EngineError::HandleObsoleted);
        }
        Ok(self.engine.execute_turn(activity))
    }
}
