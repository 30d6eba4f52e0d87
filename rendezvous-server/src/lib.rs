pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod signaling;
pub mod storage;
pub mod tasks;
pub mod transport;

pub use config::{Config, ConfigError, StorageBackend, TransportKind};
pub use engine::{Coordinator, Dispatch, JoinPolicy};
pub use error::{FrameError, SignalingError, StoreError, TransportError};
pub use http::{AppState, build_routes};
pub use signaling::Session;
pub use storage::{DurableRoomStore, MemoryRoomStore, RoomStore};
pub use transport::{
    ConnectionRegistry, EventBusTransport, SignalTransport, SocketTransport,
};
