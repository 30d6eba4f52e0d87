mod durable;
mod memory;
mod room_store;

pub use durable::*;
pub use memory::*;
pub use room_store::*;
