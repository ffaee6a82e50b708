//! Wire shapes for the REST turn loop's JSON responses.

use serde::Deserialize;

use crate::activity::Activity;

/// Whether the bot wants another hop in this turn, or is done and waiting
/// for the next user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnAction {
    /// The engine must issue another REST request to advance the turn.
    Continue,
    /// The bot has finished this turn.
    Waiting,
}

/// The JSON body of a REST turn-loop response.
#[derive(Debug, Clone, Deserialize)]
pub struct BotResponse {
    /// Whether to continue the turn or stop.
    pub action: TurnAction,
    /// Activities produced by this hop, in order.
    #[serde(default)]
    pub activities: Vec<Activity>,
    /// The conversation id, present on the first hop of a new conversation.
    #[serde(rename = "conversationId", default)]
    pub conversation_id: Option<String>,
}
