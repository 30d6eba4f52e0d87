mod room_sweeper;

pub use room_sweeper::*;
