use crate::error::CallError;
use tether_core::SignalingMessage;
use tokio::sync::oneshot;

/// Everything a room actor reacts to, processed one at a time.
#[derive(Debug)]
pub enum RoomCommand {
    /// User pressed "start call".
    StartCall {
        reply: oneshot::Sender<Result<(), CallError>>,
    },

    /// User pressed "end call". `done` fires once resources are released.
    EndCall { done: oneshot::Sender<()> },

    /// Frame relayed from the peer for this room.
    Signal(SignalingMessage),

    /// The signaling link dropped; nothing negotiated so far can be trusted.
    LinkLost,
}
