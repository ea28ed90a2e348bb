use std::fmt;
use std::sync::Arc;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Local capture owned by exactly one session. Not `Clone`: whoever holds it
/// is the one who hands it back to the capture device.
pub struct MediaHandle {
    stream_id: String,
    tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
}

impl MediaHandle {
    pub fn new(stream_id: impl Into<String>, tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>) -> Self {
        Self {
            stream_id: stream_id.into(),
            tracks,
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn tracks(&self) -> &[Arc<dyn TrackLocal + Send + Sync>] {
        &self.tracks
    }
}

impl fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaHandle")
            .field("stream_id", &self.stream_id)
            .field("tracks", &self.tracks.len())
            .finish()
    }
}

/// The counterpart's media as it is surfaced to the UI. Tracks of the same
/// remote stream accumulate here as they arrive.
#[derive(Clone)]
pub struct RemoteStream {
    stream_id: String,
    tracks: Vec<Arc<TrackRemote>>,
}

impl RemoteStream {
    pub fn new(stream_id: impl Into<String>, tracks: Vec<Arc<TrackRemote>>) -> Self {
        Self {
            stream_id: stream_id.into(),
            tracks,
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn tracks(&self) -> &[Arc<TrackRemote>] {
        &self.tracks
    }

    pub(crate) fn merge(&mut self, other: RemoteStream) {
        self.tracks.extend(other.tracks);
    }
}

impl PartialEq for RemoteStream {
    fn eq(&self, other: &Self) -> bool {
        self.stream_id == other.stream_id && self.tracks.len() == other.tracks.len()
    }
}

impl fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStream")
            .field("stream_id", &self.stream_id)
            .field("tracks", &self.tracks.len())
            .finish()
    }
}
