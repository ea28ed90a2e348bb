use crate::error::CallError;
use crate::media::{MediaCapture, MediaConstraints, MediaHandle};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Capture without devices: negotiates Opus and VP8 tracks that never carry
/// samples. Used by the CLI and by headless peers.
#[derive(Default)]
pub struct SyntheticCapture {
    next_stream: AtomicU64,
}

impl SyntheticCapture {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaCapture for SyntheticCapture {
    async fn acquire_local_stream(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaHandle, CallError> {
        if !constraints.audio && constraints.video.is_none() {
            return Err(CallError::Capture(
                "neither audio nor video was requested".to_owned(),
            ));
        }

        let stream_id = format!(
            "tether-local-{}",
            self.next_stream.fetch_add(1, Ordering::Relaxed)
        );
        let mut tracks: Vec<Arc<dyn TrackLocal + Send + Sync>> = Vec::new();

        if constraints.audio {
            tracks.push(Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_OPUS.to_owned(),
                    ..Default::default()
                },
                "audio".to_owned(),
                stream_id.clone(),
            )));
        }

        if let Some(video) = &constraints.video {
            debug!(
                "Synthetic video at {}x{}@{}",
                video.width.ideal, video.height.ideal, video.frame_rate.ideal
            );
            tracks.push(Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_VP8.to_owned(),
                    ..Default::default()
                },
                "video".to_owned(),
                stream_id.clone(),
            )));
        }

        info!("Got local stream {} ({} tracks)", stream_id, tracks.len());
        Ok(MediaHandle::new(stream_id, tracks))
    }

    fn release(&self, media: MediaHandle) {
        info!("Releasing local stream {}", media.stream_id());
    }
}
