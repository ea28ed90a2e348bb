use crate::session::{SessionEvent, SessionState};
use thiserror::Error;

/// Everything that can go wrong while placing or holding a call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// The relay could not be reached. The transport has already retried.
    #[error("Failed to connect to server: {0}")]
    Connection(String),

    /// `send` on a link that is not connected.
    #[error("Signaling link is not connected")]
    NotConnected,

    /// Malformed or unexpected frame. The frame is dropped, the call goes on.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The event is not valid in the session's current state and was ignored.
    #[error("Invalid transition: {event} while {state}")]
    InvalidTransition {
        state: SessionState,
        event: SessionEvent,
    },

    /// Description or peer-connection failure. The session is closed.
    #[error("Negotiation failed while {state}: {reason}")]
    Negotiation { state: SessionState, reason: String },

    /// Local media could not be acquired; nothing was sent to the peer.
    #[error("Failed to access camera or microphone: {0}")]
    Capture(String),
}

impl CallError {
    /// Whether the session that produced this error had to be torn down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CallError::Negotiation { .. } | CallError::Capture(_))
    }
}
