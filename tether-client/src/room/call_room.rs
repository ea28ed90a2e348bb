use crate::error::CallError;
use crate::media::RemoteStream;
use crate::room::{CallContext, CallStatus, RoomCommand, RoomRegistry};
use crate::session::{Negotiation, PeerSession, Role, SessionEvent, SessionState};
use crate::transport::TransportEvent;
use tether_core::{RoomId, SessionDescription, SessionId, SignalingMessage};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

struct NegotiationResult {
    session_id: SessionId,
    result: anyhow::Result<SessionDescription>,
}

/// Actor owning the (at most one) live session of a room.
pub struct CallRoom {
    room: RoomId,
    ctx: CallContext,
    registry: RoomRegistry,
    session: Option<PeerSession>,
    remote_stream: Option<RemoteStream>,
    /// A call ended or failed here and nothing has started since.
    finished: bool,
    me: mpsc::WeakSender<RoomCommand>,
    command_rx: mpsc::Receiver<RoomCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    negotiation_rx: mpsc::Receiver<NegotiationResult>,
    negotiation_tx: mpsc::Sender<NegotiationResult>,
}

impl CallRoom {
    pub fn new(
        room: RoomId,
        registry: RoomRegistry,
        command_rx: mpsc::Receiver<RoomCommand>,
        me: mpsc::WeakSender<RoomCommand>,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::channel(256);
        let (negotiation_tx, negotiation_rx) = mpsc::channel(4);

        Self {
            room,
            ctx: registry.ctx.clone(),
            registry,
            session: None,
            remote_stream: None,
            finished: false,
            me,
            command_rx,
            transport_rx,
            transport_tx,
            negotiation_rx,
            negotiation_tx,
        }
    }

    pub async fn run(mut self) {
        info!("Room {} event loop started", self.room);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Shutting down room {}.", self.room);
                            break;
                        }
                    }
                }

                evt = self.transport_rx.recv() => {
                    if let Some(e) = evt {
                        self.handle_transport_event(e).await;
                    }
                }

                res = self.negotiation_rx.recv() => {
                    if let Some(r) = res {
                        self.handle_negotiation(r).await;
                    }
                }
            }

            if self.finished && self.live_session().is_none() {
                self.retire().await;
                break;
            }
        }

        if let Some(session) = self.session.as_mut() {
            session.close().await;
        }
        info!("Room {} event loop finished", self.room);
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::StartCall { reply } => {
                let result = self.start_call().await;
                let _ = reply.send(result);
            }

            RoomCommand::EndCall { done } => {
                self.end_call(SessionEvent::LocalHangup).await;
                let _ = done.send(());
            }

            RoomCommand::Signal(msg) => self.handle_signal(msg).await,

            RoomCommand::LinkLost => {
                if let Some(session) = self.live_session() {
                    warn!(
                        "Signaling lost while session {} was {}",
                        session.id(),
                        session.state()
                    );
                }
                self.teardown(CallStatus::Error("disconnected".to_owned()))
                    .await;
            }
        }
    }

    /// Leave the registry, then pass on anything already queued here to
    /// whichever actor takes over the room.
    async fn retire(&mut self) {
        self.registry.retire(&self.room, &self.me);
        self.command_rx.close();

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                RoomCommand::StartCall { .. }
                | RoomCommand::Signal(SignalingMessage::Offer { .. }) => {
                    debug!("Handing queued command over to a fresh room {}", self.room);
                    if self.registry.deliver(&self.room, cmd).await.is_err() {
                        warn!("Dropped queued command for room {}", self.room);
                    }
                }
                RoomCommand::EndCall { done } => {
                    let _ = done.send(());
                }
                RoomCommand::Signal(msg) => {
                    debug!("Ignoring {} for finished room {}", msg.kind(), self.room);
                }
                RoomCommand::LinkLost => {}
            }
        }
    }

    async fn start_call(&mut self) -> Result<(), CallError> {
        if let Some(session) = self.live_session() {
            return Err(CallError::InvalidTransition {
                state: session.state(),
                event: SessionEvent::StartAsInitiator,
            });
        }

        info!("Starting call in room {}", self.room);
        if let Err(e) = self.ctx.link.connect().await {
            self.report(CallStatus::Error(e.to_string())).await;
            return Err(e);
        }

        let media = match self.ctx.capture.acquire_local_stream(&self.ctx.constraints).await {
            Ok(media) => media,
            Err(e) => {
                self.report(CallStatus::Error(e.to_string())).await;
                return Err(e);
            }
        };
        let mut session = match self.open_session(Role::Initiator).await {
            Ok(session) => session,
            Err(e) => {
                self.ctx.capture.release(media);
                return Err(e);
            }
        };

        self.report(CallStatus::Negotiating).await;
        let started = session
            .start_as_initiator(media, self.ctx.offer_options)
            .await;
        self.begin(session, started).await
    }

    async fn handle_signal(&mut self, msg: SignalingMessage) {
        match msg {
            SignalingMessage::Join { room } => {
                info!("Peer joined room {}", room);
            }

            SignalingMessage::Offer { sdp, .. } => self.handle_remote_offer(sdp).await,

            SignalingMessage::Answer { sdp, .. } => {
                let Some(state) = self.live_session().map(|s| s.state()) else {
                    debug!("Ignoring answer for room {} with no live session", self.room);
                    return;
                };
                if state != SessionState::AwaitingAnswer {
                    debug!(
                        "Ignoring late or duplicate answer for room {} ({})",
                        self.room, state
                    );
                    return;
                }

                let Some(session) = self.session.as_mut() else {
                    return;
                };
                match session.remote_answer_received(sdp).await {
                    Ok(()) => self.report(CallStatus::Connected).await,
                    Err(e) => self.fatal(e).await,
                }
            }

            SignalingMessage::Candidate { candidate, .. } => {
                let Some(session) = self.session.as_mut() else {
                    debug!("Dropping candidate for room {} with no session", self.room);
                    return;
                };
                if let Err(e) = session.candidate_received(candidate).await {
                    debug!("Candidate ignored in room {}: {}", self.room, e);
                }
            }

            SignalingMessage::Leave { room } => {
                if self.live_session().is_none() {
                    debug!("Leave for room {} with no live session", room);
                    return;
                }
                info!("Peer left room {}", room);
                self.end_call(SessionEvent::RemoteLeave).await;
            }
        }
    }

    async fn handle_remote_offer(&mut self, offer: SessionDescription) {
        if let Some(session) = self.live_session() {
            if !session.yields_to(&offer) {
                let err = CallError::InvalidTransition {
                    state: session.state(),
                    event: SessionEvent::RemoteOfferReceived,
                };
                warn!(
                    "Rejecting offer for room {}: {:?} session exists ({})",
                    self.room,
                    session.role(),
                    err
                );
                return;
            }

            info!(
                "Glare in room {}: dropping own offer ({}) and answering",
                self.room,
                session.state()
            );
            if let Some(session) = self.session.as_mut() {
                session.close().await;
            }
        }

        let media = match self.ctx.capture.acquire_local_stream(&self.ctx.constraints).await {
            Ok(media) => media,
            Err(e) => {
                self.report(CallStatus::Error(e.to_string())).await;
                return;
            }
        };
        let Ok(mut session) = self.open_session(Role::Responder).await else {
            self.ctx.capture.release(media);
            return;
        };

        self.report(CallStatus::Negotiating).await;
        let started = session.remote_offer_received(media, offer).await;
        if let Err(e) = self.begin(session, started).await {
            debug!("Answering in room {} failed: {}", self.room, e);
        }
    }

    async fn open_session(&mut self, role: Role) -> Result<PeerSession, CallError> {
        let session_id = SessionId::new();

        let connection = match self
            .ctx
            .factory
            .create(session_id, self.transport_tx.clone())
            .await
        {
            Ok(connection) => connection,
            Err(e) => {
                let err = CallError::Negotiation {
                    state: SessionState::Idle,
                    reason: format!("Failed to create peer connection: {e}"),
                };
                error!("Room {}: {}", self.room, err);
                self.report(CallStatus::Error(err.to_string())).await;
                return Err(err);
            }
        };

        Ok(PeerSession::new(
            session_id,
            self.room.clone(),
            role,
            connection,
            self.ctx.capture.clone(),
            self.ctx.candidates.clone(),
        ))
    }

    /// Install `session` and spawn its first description step.
    async fn begin(
        &mut self,
        mut session: PeerSession,
        started: Result<Negotiation, CallError>,
    ) -> Result<(), CallError> {
        self.remote_stream = None;
        self.finished = false;

        let negotiation = match started {
            Ok(negotiation) => negotiation,
            Err(e) => {
                self.session = Some(session);
                self.fatal(e.clone()).await;
                return Err(e);
            }
        };

        if let Some(connection) = session.connection() {
            let tx = self.negotiation_tx.clone();
            let session_id = session.id();
            let task = tokio::spawn(async move {
                let result = negotiation.run(connection).await;
                let _ = tx.send(NegotiationResult { session_id, result }).await;
            });
            session.track_pending(task.abort_handle());
        }

        self.session = Some(session);
        Ok(())
    }

    async fn handle_negotiation(&mut self, outcome: NegotiationResult) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.id() != outcome.session_id {
            debug!("Discarding description for replaced session {}", outcome.session_id);
            return;
        }

        match session.description_created(outcome.result).await {
            Ok(Some(msg)) => {
                let is_offer = matches!(msg, SignalingMessage::Offer { .. });
                if is_offer {
                    self.send(SignalingMessage::Join {
                        room: self.room.clone(),
                    })
                    .await;
                }
                self.send(msg).await;

                let held = self
                    .session
                    .as_mut()
                    .map(|s| s.take_local_candidates())
                    .unwrap_or_default();
                for candidate in held {
                    self.send(SignalingMessage::Candidate {
                        candidate,
                        room: self.room.clone(),
                    })
                    .await;
                }

                if !is_offer {
                    self.report(CallStatus::Connected).await;
                }
            }
            Ok(None) => {}
            Err(e) => self.fatal(e).await,
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::CandidateGenerated(session_id, candidate) => {
                if !self.is_current(session_id) {
                    return;
                }
                let Some(candidate) = self
                    .session
                    .as_mut()
                    .and_then(|s| s.local_candidate(candidate))
                else {
                    debug!("Holding local candidate for room {} until it can go out", self.room);
                    return;
                };
                self.send(SignalingMessage::Candidate {
                    candidate,
                    room: self.room.clone(),
                })
                .await;
            }

            TransportEvent::TrackAdded(session_id, stream) => {
                if !self.is_current(session_id) {
                    return;
                }
                let merged = match self.remote_stream.take() {
                    Some(mut current) if current.stream_id() == stream.stream_id() => {
                        current.merge(stream);
                        current
                    }
                    _ => stream,
                };
                self.remote_stream = Some(merged.clone());
                info!("Remote stream {} available in room {}", merged.stream_id(), self.room);
                self.report(CallStatus::RemoteStreamAvailable(merged)).await;
            }

            TransportEvent::Disconnected(session_id) => {
                if !self.is_current(session_id) {
                    return;
                }
                let state = self
                    .live_session()
                    .map(|s| s.state())
                    .unwrap_or(SessionState::Closed);
                self.fatal(CallError::Negotiation {
                    state,
                    reason: "peer connection lost".to_owned(),
                })
                .await;
            }
        }
    }

    async fn end_call(&mut self, event: SessionEvent) {
        let Some(session) = self.live_session() else {
            return;
        };
        let notify_peer = event == SessionEvent::LocalHangup && session.peer_aware();
        info!("Ending call in room {} ({})", self.room, event);

        self.teardown(CallStatus::Idle).await;
        if notify_peer {
            self.send(SignalingMessage::Leave {
                room: self.room.clone(),
            })
            .await;
        }
    }

    /// Close whatever is live and clear remote media, then report `status`.
    async fn teardown(&mut self, status: CallStatus) {
        if let Some(session) = self.session.as_mut() {
            session.close().await;
        }
        self.remote_stream = None;
        self.report(status).await;
    }

    async fn fatal(&mut self, err: CallError) {
        error!("Call in room {} failed: {}", self.room, err);
        self.teardown(CallStatus::Error(err.to_string())).await;
    }

    async fn send(&self, msg: SignalingMessage) {
        if let Err(e) = self.ctx.link.send(&msg).await {
            warn!("Failed to send {} for room {}: {}", msg.kind(), self.room, e);
        }
    }

    async fn report(&mut self, status: CallStatus) {
        if matches!(status, CallStatus::Idle | CallStatus::Error(_)) {
            self.finished = true;
        }
        self.ctx.observer.on_status(&self.room, status).await;
    }

    fn is_current(&self, session_id: SessionId) -> bool {
        self.live_session().is_some_and(|s| s.id() == session_id)
    }

    fn live_session(&self) -> Option<&PeerSession> {
        self.session.as_ref().filter(|s| !s.state().is_closed())
    }
}
