mod event_bus;
pub mod frame;
mod signal_transport;
mod socket;

pub use event_bus::*;
pub use signal_transport::*;
pub use socket::*;
