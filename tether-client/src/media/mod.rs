mod media_capture;
mod media_handle;
mod synthetic_capture;

pub use media_capture::*;
pub use media_handle::*;
pub use synthetic_capture::*;
