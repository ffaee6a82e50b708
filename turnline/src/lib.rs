#![deny(missing_docs)]
//! # turnline — umbrella crate
//!
//! Single import surface for the half-duplex, turn-based conversation
//! protocol engine. Re-exports `turnline-core` and `turnline-adapter` behind
//! feature flags, plus a `prelude` for the happy path.

#[cfg(feature = "core")]
pub use turnline_core;

#[cfg(feature = "adapter")]
pub use turnline_adapter;

/// Happy-path imports for driving a conversation end to end.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use turnline_core::{
        Activity, BotResponse, ClientConfig, EngineError, NoopTelemetry, ProtocolEngine,
        RetryConfig, Strategy, StrategyRequestPrep, TelemetryClient, Transport, TurnAction,
        TurnHandle, TurnStream, TurnStreamItem,
    };

    #[cfg(feature = "adapter")]
    pub use turnline_adapter::{
        ChatAdapter, ConnectionStatus, ConversationStart, ConversationStarter, EngineStarter,
    };
}
