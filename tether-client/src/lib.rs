mod config;
mod error;
mod media;
mod room;
mod session;
mod signaling;
mod transport;

pub use config::*;
pub use error::*;
pub use media::*;
pub use room::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;
