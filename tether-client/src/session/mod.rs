mod candidate_queue;
mod peer_session;
mod session_state;

pub use candidate_queue::*;
pub use peer_session::*;
pub use session_state::*;
