use dashmap::DashMap;
use tether_core::{IceCandidate, SessionId};
use tracing::debug;

enum Slot {
    /// Remote description not applied yet; hold candidates in arrival order.
    Buffering(Vec<IceCandidate>),
    /// Drained once; later candidates go straight to the connection.
    Ready,
}

/// What the caller should do with a candidate it just handed to the queue.
#[derive(Debug, PartialEq, Eq)]
pub enum Enqueued {
    Buffered,
    ApplyNow(IceCandidate),
    /// The session is unknown or already closed.
    Discarded,
}

/// Per-session holding pen for trickled candidates that arrive before the
/// remote description does.
#[derive(Default)]
pub struct CandidateQueue {
    slots: DashMap<SessionId, Slot>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start buffering for a fresh session.
    pub fn open(&self, session_id: SessionId) {
        self.slots.insert(session_id, Slot::Buffering(Vec::new()));
    }

    pub fn enqueue(&self, session_id: SessionId, candidate: IceCandidate) -> Enqueued {
        let Some(mut slot) = self.slots.get_mut(&session_id) else {
            debug!("Dropping candidate for closed session {}", session_id);
            return Enqueued::Discarded;
        };

        match slot.value_mut() {
            Slot::Buffering(pending) => {
                pending.push(candidate);
                Enqueued::Buffered
            }
            Slot::Ready => Enqueued::ApplyNow(candidate),
        }
    }

    /// Remote description is set: hand back everything buffered, in order,
    /// and switch the session to pass-through. Only the first call returns
    /// anything.
    pub fn mark_ready(&self, session_id: SessionId) -> Vec<IceCandidate> {
        let Some(mut slot) = self.slots.get_mut(&session_id) else {
            return Vec::new();
        };

        match std::mem::replace(slot.value_mut(), Slot::Ready) {
            Slot::Buffering(pending) => pending,
            Slot::Ready => Vec::new(),
        }
    }

    /// Forget the session. Returns how many buffered candidates were dropped.
    pub fn discard(&self, session_id: SessionId) -> usize {
        match self.slots.remove(&session_id) {
            Some((_, Slot::Buffering(pending))) => pending.len(),
            _ => 0,
        }
    }

    pub fn pending(&self, session_id: SessionId) -> usize {
        match self.slots.get(&session_id).as_deref() {
            Some(Slot::Buffering(pending)) => pending.len(),
            _ => 0,
        }
    }
}
