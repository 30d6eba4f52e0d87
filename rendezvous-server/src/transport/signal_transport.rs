use crate::error::TransportError;
use async_trait::async_trait;
use rendezvous_core::{ConnectionId, RoomId, SignalingMessage};
use tokio::sync::mpsc;

/// Outbound seam of the coordination engine.
///
/// Both calls are best-effort: a connection that is already gone is
/// skipped without error. Only adapter faults (e.g. a frame that cannot be
/// encoded) come back as `Err`.
#[async_trait]
pub trait SignalTransport: Send + Sync {
    /// Deliver one message to one connection.
    async fn send(
        &self,
        connection_id: &ConnectionId,
        message: &SignalingMessage,
    ) -> Result<(), TransportError>;

    /// Deliver to every connection currently associated with the room,
    /// except `exclude`.
    async fn broadcast(
        &self,
        room_id: &RoomId,
        message: &SignalingMessage,
        exclude: Option<&ConnectionId>,
    ) -> Result<(), TransportError>;
}

/// Live-connection bookkeeping owned by a transport adapter.
///
/// Driven by the session glue, never by the engine: a connection is opened
/// when a client attaches, associated with rooms as joins and leaves
/// succeed, and closed when the client goes away.
pub trait ConnectionRegistry: Send + Sync {
    /// Registers a new connection. The receiver yields encoded frames for
    /// the wire, in send order.
    fn open(&self) -> (ConnectionId, mpsc::UnboundedReceiver<String>);

    /// Forgets the connection and all its room associations. Idempotent.
    fn close(&self, connection_id: &ConnectionId);

    fn join_room(&self, connection_id: &ConnectionId, room_id: &RoomId);

    fn leave_room(&self, connection_id: &ConnectionId, room_id: &RoomId);
}
