mod candidate;
mod description;
mod room;
mod session;
mod signaling;

pub use candidate::IceCandidate;
pub use description::{SdpType, SessionDescription};
pub use room::{InvalidRoomId, RoomId};
pub use session::SessionId;
pub use signaling::{IceServerConfig, SignalingMessage};
