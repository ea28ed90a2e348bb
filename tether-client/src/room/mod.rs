mod call_context;
mod call_observer;
mod call_room;
mod room_command;
mod room_registry;
mod session_manager;

pub use call_context::*;
pub use call_observer::*;
pub use call_room::*;
pub use room_command::*;
pub use room_registry::*;
pub use session_manager::*;
