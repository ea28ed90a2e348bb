use std::fmt;

/// Which side of the offer/answer exchange a session plays. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Initiator,
    Responder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    CreatingOffer,
    AwaitingAnswer,
    CreatingAnswer,
    Connected,
    Closed,
}

impl SessionState {
    pub fn is_closed(self) -> bool {
        self == SessionState::Closed
    }

    /// Our own offer or answer is still being produced.
    pub fn is_describing(self) -> bool {
        matches!(
            self,
            SessionState::CreatingOffer | SessionState::CreatingAnswer
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::CreatingOffer => "creating-offer",
            SessionState::AwaitingAnswer => "awaiting-answer",
            SessionState::CreatingAnswer => "creating-answer",
            SessionState::Connected => "connected",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Inputs to the session state machine, named for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    StartAsInitiator,
    OfferCreated,
    RemoteOfferReceived,
    AnswerCreated,
    RemoteAnswerReceived,
    CandidateReceived,
    LocalHangup,
    RemoteLeave,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionEvent::StartAsInitiator => "start-as-initiator",
            SessionEvent::OfferCreated => "offer-created",
            SessionEvent::RemoteOfferReceived => "remote-offer-received",
            SessionEvent::AnswerCreated => "answer-created",
            SessionEvent::RemoteAnswerReceived => "remote-answer-received",
            SessionEvent::CandidateReceived => "candidate-received",
            SessionEvent::LocalHangup => "local-hangup",
            SessionEvent::RemoteLeave => "remote-leave",
        };
        f.write_str(name)
    }
}
