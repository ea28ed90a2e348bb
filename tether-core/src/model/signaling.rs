use crate::model::candidate::IceCandidate;
use crate::model::description::SessionDescription;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(urls: &[&str]) -> Self {
        Self {
            urls: urls.iter().map(|u| (*u).to_owned()).collect(),
            username: None,
            credential: None,
        }
    }
}

/// One relay frame. Every variant names the room it belongs to; the relay
/// routes on `room` and the client routes on the tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SignalingMessage {
    #[serde(rename = "join-room")]
    Join { room: RoomId },

    #[serde(rename = "offer")]
    Offer {
        #[serde(rename = "offer")]
        sdp: SessionDescription,
        room: RoomId,
    },

    #[serde(rename = "answer")]
    Answer {
        #[serde(rename = "answer")]
        sdp: SessionDescription,
        room: RoomId,
    },

    #[serde(rename = "ice-candidate")]
    Candidate { candidate: IceCandidate, room: RoomId },

    #[serde(rename = "leave-room")]
    Leave { room: RoomId },
}

impl SignalingMessage {
    pub fn room(&self) -> &RoomId {
        match self {
            SignalingMessage::Join { room }
            | SignalingMessage::Offer { room, .. }
            | SignalingMessage::Answer { room, .. }
            | SignalingMessage::Candidate { room, .. }
            | SignalingMessage::Leave { room } => room,
        }
    }

    /// Wire tag, handy for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalingMessage::Join { .. } => "join-room",
            SignalingMessage::Offer { .. } => "offer",
            SignalingMessage::Answer { .. } => "answer",
            SignalingMessage::Candidate { .. } => "ice-candidate",
            SignalingMessage::Leave { .. } => "leave-room",
        }
    }
}
