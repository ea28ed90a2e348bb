use crate::config::ClientConfig;
use crate::media::{MediaCapture, MediaConstraints};
use crate::room::CallObserver;
use crate::session::CandidateQueue;
use crate::signaling::SignalingLink;
use crate::transport::{OfferOptions, PeerConnectionFactory};
use std::sync::Arc;

/// Collaborators every room actor shares. Cheap to clone.
#[derive(Clone)]
pub struct CallContext {
    pub link: Arc<SignalingLink>,
    pub factory: Arc<dyn PeerConnectionFactory>,
    pub capture: Arc<dyn MediaCapture>,
    pub observer: Arc<dyn CallObserver>,
    pub candidates: Arc<CandidateQueue>,
    pub constraints: MediaConstraints,
    pub offer_options: OfferOptions,
}

impl CallContext {
    pub fn new(
        link: Arc<SignalingLink>,
        factory: Arc<dyn PeerConnectionFactory>,
        capture: Arc<dyn MediaCapture>,
        observer: Arc<dyn CallObserver>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            link,
            factory,
            capture,
            observer,
            candidates: Arc::new(CandidateQueue::new()),
            constraints: config.media.clone(),
            offer_options: config.offer,
        }
    }
}
