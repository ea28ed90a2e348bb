pub use tether_core::{RoomId, SessionId};

pub mod model {
    pub use tether_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use tether_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use tether_relay::*;
}
