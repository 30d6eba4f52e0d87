mod record;
mod room_unit;
mod store;

pub use store::DurableRoomStore;
