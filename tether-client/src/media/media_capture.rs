use crate::error::CallError;
use crate::media::MediaHandle;
use async_trait::async_trait;
use serde::Deserialize;

/// Camera/microphone access. Implemented by the embedding application.
#[async_trait]
pub trait MediaCapture: Send + Sync + 'static {
    async fn acquire_local_stream(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaHandle, CallError>;

    /// Stop the tracks and give the devices back.
    fn release(&self, media: MediaHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Range {
    pub min: u32,
    pub ideal: u32,
    pub max: u32,
}

impl Range {
    pub const fn new(min: u32, ideal: u32, max: u32) -> Self {
        Self { min, ideal, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    Environment,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VideoConstraints {
    pub width: Range,
    pub height: Range,
    pub frame_rate: Range,
    pub facing_mode: FacingMode,
    pub aspect_ratio: f64,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            width: Range::new(640, 1280, 1920),
            height: Range::new(480, 720, 1080),
            frame_rate: Range::new(15, 30, 60),
            facing_mode: FacingMode::User,
            aspect_ratio: 1.333333,
        }
    }
}

/// What to ask the capture device for. Defaults to a front-camera 720p call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: Option<VideoConstraints>,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: Some(VideoConstraints::default()),
        }
    }
}
