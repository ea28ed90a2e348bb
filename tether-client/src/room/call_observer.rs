use crate::media::RemoteStream;
use async_trait::async_trait;
use tether_core::RoomId;
use tokio::sync::mpsc;

/// What the UI shows for a room.
#[derive(Debug, Clone, PartialEq)]
pub enum CallStatus {
    Idle,
    Negotiating,
    Connected,
    /// Human-readable reason. The call is over and media is released.
    Error(String),
    RemoteStreamAvailable(RemoteStream),
}

/// Receives status updates from every room. Implemented by the UI layer.
#[async_trait]
pub trait CallObserver: Send + Sync + 'static {
    async fn on_status(&self, room: &RoomId, status: CallStatus);
}

/// [`CallObserver`] that turns updates into a stream for the UI to poll.
#[derive(Clone)]
pub struct StatusChannel {
    tx: mpsc::UnboundedSender<(RoomId, CallStatus)>,
}

impl StatusChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(RoomId, CallStatus)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl CallObserver for StatusChannel {
    async fn on_status(&self, room: &RoomId, status: CallStatus) {
        let _ = self.tx.send((room.clone(), status));
    }
}
