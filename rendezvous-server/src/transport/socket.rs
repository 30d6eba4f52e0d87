use crate::error::TransportError;
use crate::transport::{ConnectionRegistry, SignalTransport, frame};
use async_trait::async_trait;
use dashmap::DashMap;
use rendezvous_core::{ConnectionId, RoomId, SignalingMessage};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Transport for raw bidirectional sockets, which have no notion of rooms.
///
/// The adapter keeps its own room membership: room → connections, plus the
/// reverse connection → rooms index used when a connection closes. Each
/// instance owns its maps, so two adapters never see each other's
/// connections.
#[derive(Default)]
pub struct SocketTransport {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<String>>,
    rooms: DashMap<RoomId, HashSet<ConnectionId>>,
    memberships: DashMap<ConnectionId, HashSet<RoomId>>,
}

impl SocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an existing outbound sender under a fresh id.
    pub fn register(&self, tx: mpsc::UnboundedSender<String>) -> ConnectionId {
        let connection_id = ConnectionId::new();
        self.connections.insert(connection_id, tx);
        debug!("Socket {} registered", connection_id);
        connection_id
    }

    pub fn unregister(&self, connection_id: &ConnectionId) {
        self.connections.remove(connection_id);

        let rooms = self
            .memberships
            .remove(connection_id)
            .map(|(_, rooms)| rooms)
            .unwrap_or_default();
        for room_id in &rooms {
            self.detach(room_id, connection_id);
        }

        debug!(
            "Socket {} unregistered ({} room memberships dropped)",
            connection_id,
            rooms.len()
        );
    }

    pub fn add_to_room(&self, room_id: &RoomId, connection_id: &ConnectionId) {
        if !self.connections.contains_key(connection_id) {
            debug!("Ignoring room join for unknown socket {}", connection_id);
            return;
        }

        self.rooms
            .entry(room_id.clone())
            .or_default()
            .insert(*connection_id);
        self.memberships
            .entry(*connection_id)
            .or_default()
            .insert(room_id.clone());
    }

    pub fn remove_from_room(&self, room_id: &RoomId, connection_id: &ConnectionId) {
        self.detach(room_id, connection_id);
        if let Some(mut rooms) = self.memberships.get_mut(connection_id) {
            rooms.remove(room_id);
        }
    }

    pub fn room_members(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn detach(&self, room_id: &RoomId, connection_id: &ConnectionId) {
        if let Some(mut members) = self.rooms.get_mut(room_id) {
            members.remove(connection_id);
        }
        self.rooms.remove_if(room_id, |_, members| members.is_empty());
    }

    /// Returns false when the connection is unknown or already closed.
    fn deliver(&self, connection_id: &ConnectionId, frame: &str) -> bool {
        let Some(tx) = self.connections.get(connection_id) else {
            return false;
        };
        tx.send(frame.to_owned()).is_ok()
    }
}

#[async_trait]
impl SignalTransport for SocketTransport {
    async fn send(
        &self,
        connection_id: &ConnectionId,
        message: &SignalingMessage,
    ) -> Result<(), TransportError> {
        let frame = frame::encode(message)?;
        if !self.deliver(connection_id, &frame) {
            debug!(
                "Dropped {} for closed socket {}",
                message.kind(),
                connection_id
            );
        }
        Ok(())
    }

    async fn broadcast(
        &self,
        room_id: &RoomId,
        message: &SignalingMessage,
        exclude: Option<&ConnectionId>,
    ) -> Result<(), TransportError> {
        let frame = frame::encode(message)?;

        let mut delivered = 0usize;
        for member in self.room_members(room_id) {
            if exclude == Some(&member) {
                continue;
            }
            if self.deliver(&member, &frame) {
                delivered += 1;
            } else {
                debug!("Skipping closed socket {} in room {}", member, room_id);
            }
        }

        debug!(
            "Broadcast {} to {} socket(s) in room {}",
            message.kind(),
            delivered,
            room_id
        );
        Ok(())
    }
}

impl ConnectionRegistry for SocketTransport {
    fn open(&self) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = self.register(tx);
        info!("Socket connection opened: {}", connection_id);
        (connection_id, rx)
    }

    fn close(&self, connection_id: &ConnectionId) {
        self.unregister(connection_id);
        info!("Socket connection closed: {}", connection_id);
    }

    fn join_room(&self, connection_id: &ConnectionId, room_id: &RoomId) {
        self.add_to_room(room_id, connection_id);
    }

    fn leave_room(&self, connection_id: &ConnectionId, room_id: &RoomId) {
        self.remove_from_room(room_id, connection_id);
    }
}
