use crate::error::CallError;
use crate::media::{MediaCapture, MediaHandle};
use crate::session::{CandidateQueue, Enqueued, Role, SessionEvent, SessionState};
use crate::transport::{OfferOptions, PeerConnection};
use std::sync::Arc;
use tether_core::{IceCandidate, RoomId, SessionDescription, SessionId, SignalingMessage};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// The one asynchronous description step a session may have outstanding.
pub enum Negotiation {
    CreateOffer(OfferOptions),
    /// Apply the remote offer, then answer it.
    CreateAnswer(SessionDescription),
}

impl Negotiation {
    /// Runs against the connection and leaves the result set as the local
    /// description.
    pub async fn run(
        self,
        connection: Arc<dyn PeerConnection>,
    ) -> anyhow::Result<SessionDescription> {
        match self {
            Negotiation::CreateOffer(options) => {
                let offer = connection.create_offer(options).await?;
                connection.set_local_description(offer.clone()).await?;
                Ok(offer)
            }
            Negotiation::CreateAnswer(offer) => {
                connection.set_remote_description(offer).await?;
                let answer = connection.create_answer().await?;
                connection.set_local_description(answer.clone()).await?;
                Ok(answer)
            }
        }
    }
}

/// Negotiation state machine for a single call.
pub struct PeerSession {
    id: SessionId,
    room: RoomId,
    role: Role,
    state: SessionState,
    local_description: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    connection: Option<Arc<dyn PeerConnection>>,
    media: Option<MediaHandle>,
    capture: Arc<dyn MediaCapture>,
    candidates: Arc<CandidateQueue>,
    /// Local candidates gathered before our own description went out.
    outbox: Vec<IceCandidate>,
    pending: Option<AbortHandle>,
}

impl PeerSession {
    pub fn new(
        id: SessionId,
        room: RoomId,
        role: Role,
        connection: Arc<dyn PeerConnection>,
        capture: Arc<dyn MediaCapture>,
        candidates: Arc<CandidateQueue>,
    ) -> Self {
        candidates.open(id);

        Self {
            id,
            room,
            role,
            state: SessionState::Idle,
            local_description: None,
            remote_description: None,
            connection: Some(connection),
            media: None,
            capture,
            candidates,
            outbox: Vec::new(),
            pending: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local_description.as_ref()
    }

    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote_description.as_ref()
    }

    pub fn connection(&self) -> Option<Arc<dyn PeerConnection>> {
        self.connection.clone()
    }

    /// Whether the counterpart has seen a description from this session and
    /// should be told when it ends.
    pub fn peer_aware(&self) -> bool {
        match self.role {
            Role::Initiator => self.local_description.is_some(),
            Role::Responder => self.remote_description.is_some(),
        }
    }

    /// Glare between two initiators. A session whose offer has not gone out
    /// yet always yields; once both offers are on the wire the side with the
    /// lexically smaller offer SDP yields, so both ends reach the same verdict.
    pub fn yields_to(&self, remote_offer: &SessionDescription) -> bool {
        match (self.role, self.state) {
            (Role::Initiator, SessionState::CreatingOffer) => true,
            (Role::Initiator, SessionState::AwaitingAnswer) => self
                .local_description
                .as_ref()
                .is_some_and(|local| local.sdp < remote_offer.sdp),
            _ => false,
        }
    }

    /// A candidate found by local ICE gathering. Held back while the offer
    /// or answer is still being created, since the peer cannot place it
    /// before that; returned when it may be sent right away.
    pub fn local_candidate(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        match self.state {
            state if state.is_describing() => {
                self.outbox.push(candidate);
                None
            }
            SessionState::Idle | SessionState::Closed => None,
            _ => Some(candidate),
        }
    }

    /// Local candidates held back so far, in gathering order.
    pub fn take_local_candidates(&mut self) -> Vec<IceCandidate> {
        std::mem::take(&mut self.outbox)
    }

    /// Remember the task running the outstanding [`Negotiation`] so that
    /// closing can cancel it.
    pub fn track_pending(&mut self, handle: AbortHandle) {
        self.pending = Some(handle);
    }

    /// Idle → CreatingOffer. Takes ownership of `media` even on failure.
    pub async fn start_as_initiator(
        &mut self,
        media: MediaHandle,
        options: OfferOptions,
    ) -> Result<Negotiation, CallError> {
        if self.state != SessionState::Idle || self.role != Role::Initiator {
            self.capture.release(media);
            return Err(self.invalid(SessionEvent::StartAsInitiator));
        }

        self.enter(SessionState::CreatingOffer);
        self.attach(media).await?;
        Ok(Negotiation::CreateOffer(options))
    }

    /// Idle → CreatingAnswer. Takes ownership of `media` even on failure.
    pub async fn remote_offer_received(
        &mut self,
        media: MediaHandle,
        offer: SessionDescription,
    ) -> Result<Negotiation, CallError> {
        if self.state != SessionState::Idle || self.role != Role::Responder {
            self.capture.release(media);
            return Err(self.invalid(SessionEvent::RemoteOfferReceived));
        }

        self.remote_description = Some(offer.clone());
        self.enter(SessionState::CreatingAnswer);
        self.attach(media).await?;
        Ok(Negotiation::CreateAnswer(offer))
    }

    /// Result of the outstanding [`Negotiation`]. Returns the message to send
    /// to the peer, or `None` if the session was closed in the meantime.
    pub async fn description_created(
        &mut self,
        result: anyhow::Result<SessionDescription>,
    ) -> Result<Option<SignalingMessage>, CallError> {
        self.pending = None;

        let event = match self.state {
            SessionState::Closed => {
                debug!("Discarding late description for closed session {}", self.id);
                return Ok(None);
            }
            SessionState::CreatingOffer => SessionEvent::OfferCreated,
            SessionState::CreatingAnswer => SessionEvent::AnswerCreated,
            _ => {
                let event = match self.role {
                    Role::Initiator => SessionEvent::OfferCreated,
                    Role::Responder => SessionEvent::AnswerCreated,
                };
                return Err(self.invalid(event));
            }
        };

        let description = match result {
            Ok(description) => description,
            Err(e) => return Err(self.fail(e.to_string()).await),
        };
        self.local_description = Some(description.clone());

        let room = self.room.clone();
        match event {
            SessionEvent::OfferCreated => {
                self.enter(SessionState::AwaitingAnswer);
                Ok(Some(SignalingMessage::Offer {
                    sdp: description,
                    room,
                }))
            }
            _ => {
                self.flush_candidates().await;
                self.enter(SessionState::Connected);
                Ok(Some(SignalingMessage::Answer {
                    sdp: description,
                    room,
                }))
            }
        }
    }

    /// AwaitingAnswer → Connected.
    pub async fn remote_answer_received(
        &mut self,
        answer: SessionDescription,
    ) -> Result<(), CallError> {
        match self.state {
            SessionState::AwaitingAnswer => {}
            SessionState::Closed => return Ok(()),
            _ => return Err(self.invalid(SessionEvent::RemoteAnswerReceived)),
        }

        let Some(connection) = self.connection.clone() else {
            return Err(self.fail("peer connection already released").await);
        };
        if let Err(e) = connection.set_remote_description(answer.clone()).await {
            return Err(self.fail(e.to_string()).await);
        }

        self.remote_description = Some(answer);
        self.flush_candidates().await;
        self.enter(SessionState::Connected);
        Ok(())
    }

    /// Buffer the candidate until the remote description is in place, or
    /// apply it straight away once it is.
    pub async fn candidate_received(&mut self, candidate: IceCandidate) -> Result<(), CallError> {
        match self.state {
            SessionState::Idle => return Err(self.invalid(SessionEvent::CandidateReceived)),
            SessionState::Closed => return Ok(()),
            _ => {}
        }

        match self.candidates.enqueue(self.id, candidate) {
            Enqueued::Buffered => {
                debug!(
                    "Buffered candidate for session {} ({} pending)",
                    self.id,
                    self.candidates.pending(self.id)
                );
            }
            Enqueued::ApplyNow(candidate) => self.apply_candidate(candidate).await,
            Enqueued::Discarded => {}
        }
        Ok(())
    }

    /// Any non-terminal state → Closed. Cancels the outstanding negotiation,
    /// closes the connection and releases local media. Returns `false` if the
    /// session was already closed.
    pub async fn close(&mut self) -> bool {
        if self.state.is_closed() {
            return false;
        }

        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.enter(SessionState::Closed);
        self.outbox.clear();

        let dropped = self.candidates.discard(self.id);
        if dropped > 0 {
            debug!("Discarded {} buffered candidates for {}", dropped, self.id);
        }

        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                warn!("Failed to close peer connection for {}: {:?}", self.id, e);
            }
        }
        if let Some(media) = self.media.take() {
            self.capture.release(media);
        }
        true
    }

    async fn attach(&mut self, media: MediaHandle) -> Result<(), CallError> {
        let attached = match &self.connection {
            Some(connection) => connection.attach_media(&media).await,
            None => Err(anyhow::anyhow!("peer connection already released")),
        };
        self.media = Some(media);

        match attached {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(format!("Failed to attach local media: {e}")).await),
        }
    }

    async fn flush_candidates(&mut self) {
        let ready = self.candidates.mark_ready(self.id);
        if !ready.is_empty() {
            debug!("Flushing {} buffered candidates for {}", ready.len(), self.id);
        }
        for candidate in ready {
            self.apply_candidate(candidate).await;
        }
    }

    async fn apply_candidate(&self, candidate: IceCandidate) {
        let Some(connection) = &self.connection else {
            return;
        };
        if let Err(e) = connection.add_ice_candidate(candidate).await {
            warn!("Failed to add ICE candidate for {}: {:?}", self.id, e);
        }
    }

    async fn fail(&mut self, reason: impl Into<String>) -> CallError {
        let err = CallError::Negotiation {
            state: self.state,
            reason: reason.into(),
        };
        warn!("Session {} in room {} failed: {}", self.id, self.room, err);
        self.close().await;
        err
    }

    fn invalid(&self, event: SessionEvent) -> CallError {
        CallError::InvalidTransition {
            state: self.state,
            event,
        }
    }

    fn enter(&mut self, next: SessionState) {
        info!(
            "Session {} ({:?}, room {}): {} -> {}",
            self.id, self.role, self.room, self.state, next
        );
        self.state = next;
    }
}
