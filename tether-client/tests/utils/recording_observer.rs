use async_trait::async_trait;
use std::sync::Arc;
use tether_client::{CallObserver, CallStatus};
use tether_core::RoomId;
use tokio::sync::Mutex;

/// Observer that records every status update in arrival order.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    statuses: Arc<Mutex<Vec<(RoomId, CallStatus)>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn statuses(&self, room: &RoomId) -> Vec<CallStatus> {
        self.statuses
            .lock()
            .await
            .iter()
            .filter(|(r, _)| r == room)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub async fn last(&self, room: &RoomId) -> Option<CallStatus> {
        self.statuses(room).await.pop()
    }

    /// Wait until some update for `room` matches.
    pub async fn wait_for<F>(&self, room: &RoomId, timeout_ms: u64, matches: F) -> bool
    where
        F: Fn(&CallStatus) -> bool,
    {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(timeout_ms);

        loop {
            if self.statuses(room).await.iter().any(&matches) {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    pub async fn wait_for_status(&self, room: &RoomId, status: CallStatus, timeout_ms: u64) -> bool {
        self.wait_for(room, timeout_ms, |s| *s == status).await
    }
}

#[async_trait]
impl CallObserver for RecordingObserver {
    async fn on_status(&self, room: &RoomId, status: CallStatus) {
        tracing::info!("[RecordingObserver] {}: {:?}", room, status);
        self.statuses.lock().await.push((room.clone(), status));
    }
}
