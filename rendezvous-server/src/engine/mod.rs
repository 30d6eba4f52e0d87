mod coordinator;
mod dispatch;
mod room_gate;

pub use coordinator::*;
pub use dispatch::*;
