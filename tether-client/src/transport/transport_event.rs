use crate::media::RemoteStream;
use tether_core::{IceCandidate, SessionId};

/// What a peer connection reports back to its room.
pub enum TransportEvent {
    CandidateGenerated(SessionId, IceCandidate),
    TrackAdded(SessionId, RemoteStream),
    Disconnected(SessionId),
}
