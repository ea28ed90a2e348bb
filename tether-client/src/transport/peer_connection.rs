use crate::media::MediaHandle;
use crate::transport::TransportEvent;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tether_core::{IceCandidate, SessionDescription, SessionId};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OfferOptions {
    pub receive_audio: bool,
    pub receive_video: bool,
}

impl Default for OfferOptions {
    fn default() -> Self {
        Self {
            receive_audio: true,
            receive_video: true,
        }
    }
}

/// The connectivity-establishment capability one session drives.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn attach_media(&self, media: &MediaHandle) -> Result<()>;

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Builds one connection per session. Local candidates, remote tracks and
/// failures come back through `events`, tagged with `session_id`.
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync + 'static {
    async fn create(
        &self,
        session_id: SessionId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerConnection>>;
}
