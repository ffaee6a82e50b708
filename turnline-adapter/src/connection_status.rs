//! The façade-visible connection lifecycle.

/// Monotonic connection lifecycle observed on [`crate::ChatAdapter::connection_status`].
///
/// Once [`ConnectionStatus::FailedToConnect`] or [`ConnectionStatus::Ended`]
/// is reached, no further value is ever sent — the watch channel is left
/// parked on the terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ConnectionStatus {
    /// Initial value, before the adapter is driven at all.
    Uninitialized = 0,
    /// The start-conversation callable has been invoked and is in flight.
    Connecting = 1,
    /// The first turn has begun producing (or completed) its first hop.
    Online = 2,
    /// Reserved for strategies that signal token expiry; the core protocol
    /// engine never produces this on its own.
    ExpiredToken = 3,
    /// A turn failed irrecoverably; `activity$` and `connectionStatus$` both
    /// complete after this.
    FailedToConnect = 4,
    /// Clean shutdown (the adapter was dropped without a failure).
    Ended = 5,
}

impl ConnectionStatus {
    /// Whether this value is terminal — no further status will follow.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionStatus::FailedToConnect | ConnectionStatus::Ended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_discriminant_values() {
        assert!(ConnectionStatus::Uninitialized < ConnectionStatus::Connecting);
        assert!(ConnectionStatus::Connecting < ConnectionStatus::Online);
        assert!(ConnectionStatus::Online < ConnectionStatus::ExpiredToken);
        assert!(ConnectionStatus::ExpiredToken < ConnectionStatus::FailedToConnect);
        assert!(ConnectionStatus::FailedToConnect < ConnectionStatus::Ended);
    }

    #[test]
    fn only_the_two_failure_modes_are_terminal() {
        assert!(!ConnectionStatus::Uninitialized.is_terminal());
        assert!(!ConnectionStatus::Connecting.is_terminal());
        assert!(!ConnectionStatus::Online.is_terminal());
        assert!(ConnectionStatus::FailedToConnect.is_terminal());
        assert!(ConnectionStatus::Ended.is_terminal());
    }
}
