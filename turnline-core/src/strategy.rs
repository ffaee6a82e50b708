//! The strategy port — the collaborator that supplies endpoint and
//! credential details for each turn.

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::EngineError;

/// Which wire encoding a turn should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Polling REST variant.
    Rest,
    /// Server-Sent Events variant.
    #[serde(rename = "server sent events")]
    ServerSentEvents,
}

/// What the strategy returns for a single turn.
///
/// `base_url`'s query string and fragment must be preserved verbatim on
/// every URL derived from it within the turn.
#[derive(Debug, Clone)]
pub struct StrategyRequestPrep {
    /// Base URL for this turn. May carry a query string and/or fragment.
    pub base_url: Url,
    /// Static JSON fields merged into the request body.
    pub body: Option<serde_json::Map<String, serde_json::Value>>,
    /// Static headers merged into every request of the turn.
    pub headers: Option<HashMap<String, String>>,
    /// Which transport to dispatch this turn over.
    pub transport: Transport,
}

/// The strategy port.
///
/// Consulted once per turn, at the moment the turn begins — never cached
/// across turns — so the collaborator can refresh short-lived credentials
/// between turns.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Prepare the request for starting a brand new conversation.
    async fn prepare_start_new_conversation(&self) -> Result<StrategyRequestPrep, EngineError>;

    /// Prepare the request for executing a user turn.
    async fn prepare_execute_turn(&self) -> Result<StrategyRequestPrep, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_rest_serializes_lowercase() {
        let json = serde_json::to_string(&Transport::Rest).unwrap();
        assert_eq!(json, "\"rest\"");
    }

    #[test]
    fn transport_sse_serializes_with_spaces() {
        let json = serde_json::to_string(&Transport::ServerSentEvents).unwrap();
        assert_eq!(json, "\"server sent events\"");
    }

    #[test]
    fn transport_round_trips_from_wire_values() {
        let rest: Transport = serde_json::from_str("\"rest\"").unwrap();
        assert_eq!(rest, Transport::Rest);
        let sse: Transport = serde_json::from_str("\"server sent events\"").unwrap();
        assert_eq!(sse, Transport::ServerSentEvents);
    }
}
