mod signaling_link;
mod signaling_transport;
mod ws_transport;

pub use signaling_link::*;
pub use signaling_transport::*;
pub use ws_transport::*;
