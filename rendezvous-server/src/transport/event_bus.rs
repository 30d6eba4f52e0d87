//! Transport over an event bus with native room groups.
//!
//! [`EventBus`] models a socket hub the way pub/sub servers expose it: one
//! broadcast channel per room, sockets that join and leave groups, and two
//! ways to address a group. `bus.to(room)` reaches every member;
//! `socket.to(room)` reaches every member except that socket. Exclusion is
//! therefore expressed through the excluded socket's own handle, never by
//! filtering the group from outside.
//!
//! Group frames reach a socket through one forwarder task per subscription,
//! while a direct [`BusSocket::emit`] lands in the outbox at once. Frames of
//! one group arrive in emit order, but a direct send can overtake group
//! frames emitted just before it. [`SocketTransport`](super::SocketTransport)
//! delivers both synchronously and never reorders them.

use crate::error::TransportError;
use crate::transport::{ConnectionRegistry, SignalTransport, frame};
use async_trait::async_trait;
use dashmap::DashMap;
use rendezvous_core::{ConnectionId, RoomId, SignalingMessage};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_GROUP_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
struct Envelope {
    except: Option<ConnectionId>,
    frame: Arc<str>,
}

/// Hub of room groups. Groups are created on first subscription and
/// dropped as soon as their last subscriber goes away.
pub struct EventBus {
    groups: DashMap<RoomId, broadcast::Sender<Envelope>>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            groups: DashMap::new(),
            capacity,
        }
    }

    /// Addresses every member of the room's group.
    pub fn to(&self, room_id: &RoomId) -> RoomEmitter<'_> {
        RoomEmitter {
            bus: self,
            room_id: room_id.clone(),
            except: None,
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn subscribe(&self, room_id: &RoomId) -> broadcast::Receiver<Envelope> {
        self.groups
            .entry(room_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    fn publish(&self, room_id: &RoomId, envelope: Envelope) -> usize {
        let sent = self
            .groups
            .get(room_id)
            .map(|group| group.send(envelope).unwrap_or(0));

        match sent {
            Some(0) => {
                self.prune(room_id);
                0
            }
            Some(n) => n,
            None => 0,
        }
    }

    fn prune(&self, room_id: &RoomId) {
        if self
            .groups
            .remove_if(room_id, |_, group| group.receiver_count() == 0)
            .is_some()
        {
            debug!("Room group {} dropped", room_id);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_CAPACITY)
    }
}

pub struct RoomEmitter<'a> {
    bus: &'a EventBus,
    room_id: RoomId,
    except: Option<ConnectionId>,
}

impl RoomEmitter<'_> {
    /// Returns how many group subscriptions the frame was handed to,
    /// including the excluded socket's own (which discards it).
    pub fn emit(&self, frame: &str) -> usize {
        self.bus.publish(
            &self.room_id,
            Envelope {
                except: self.except,
                frame: Arc::from(frame),
            },
        )
    }
}

/// One client attached to the bus.
pub struct BusSocket {
    id: ConnectionId,
    bus: Arc<EventBus>,
    outbox: mpsc::UnboundedSender<String>,
    subscriptions: DashMap<RoomId, CancellationToken>,
}

impl BusSocket {
    pub fn new(bus: Arc<EventBus>, outbox: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id: ConnectionId::new(),
            bus,
            outbox,
            subscriptions: DashMap::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Direct delivery to this socket. False once the client is gone.
    pub fn emit(&self, frame: &str) -> bool {
        self.outbox.send(frame.to_owned()).is_ok()
    }

    /// Addresses the room's group minus this socket.
    pub fn to(&self, room_id: &RoomId) -> RoomEmitter<'_> {
        RoomEmitter {
            bus: &self.bus,
            room_id: room_id.clone(),
            except: Some(self.id),
        }
    }

    pub fn join(&self, room_id: &RoomId) {
        if self.subscriptions.contains_key(room_id) {
            return;
        }

        // Subscribe before spawning so nothing emitted after join() is missed.
        let mut rx = self.bus.subscribe(room_id);
        let bus = Arc::clone(&self.bus);
        let outbox = self.outbox.clone();
        let stop = CancellationToken::new();
        let me = self.id;
        let room = room_id.clone();

        tokio::spawn({
            let stop = stop.clone();
            async move {
                loop {
                    let received = tokio::select! {
                        biased;
                        _ = stop.cancelled() => break,
                        received = rx.recv() => received,
                    };
                    match received {
                        Ok(envelope) => {
                            if envelope.except == Some(me) {
                                continue;
                            }
                            if outbox.send(envelope.frame.to_string()).is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Socket {} lagged {} frame(s) behind in room {}", me, skipped, room);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }

                drop(rx);
                bus.prune(&room);
            }
        });

        self.subscriptions.insert(room_id.clone(), stop);
    }

    pub fn leave(&self, room_id: &RoomId) {
        if let Some((_, stop)) = self.subscriptions.remove(room_id) {
            stop.cancel();
        }
    }

    pub fn rooms(&self) -> Vec<RoomId> {
        self.subscriptions
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn leave_all(&self) {
        for room_id in self.rooms() {
            self.leave(&room_id);
        }
    }
}

impl Drop for BusSocket {
    fn drop(&mut self) {
        self.leave_all();
    }
}

/// [`SignalTransport`] over an [`EventBus`]. Tracks one [`BusSocket`] per
/// adapter-assigned connection id.
pub struct EventBusTransport {
    bus: Arc<EventBus>,
    sockets: DashMap<ConnectionId, Arc<BusSocket>>,
}

impl EventBusTransport {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            sockets: DashMap::new(),
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn socket(&self, connection_id: &ConnectionId) -> Option<Arc<BusSocket>> {
        self.sockets
            .get(connection_id)
            .map(|socket| Arc::clone(&socket))
    }
}

impl Default for EventBusTransport {
    fn default() -> Self {
        Self::new(Arc::new(EventBus::default()))
    }
}

#[async_trait]
impl SignalTransport for EventBusTransport {
    async fn send(
        &self,
        connection_id: &ConnectionId,
        message: &SignalingMessage,
    ) -> Result<(), TransportError> {
        let frame = frame::encode(message)?;
        let delivered = self
            .socket(connection_id)
            .is_some_and(|socket| socket.emit(&frame));
        if !delivered {
            debug!("Dropped {} for gone socket {}", message.kind(), connection_id);
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

        let reached = match exclude.and_then(|id| self.socket(id)) {
            Some(excluded) => excluded.to(room_id).emit(&frame),
            None => self.bus.to(room_id).emit(&frame),
        };

        debug!(
            "Emitted {} to room {} ({} subscription(s))",
            message.kind(),
            room_id,
            reached
        );
        Ok(())
    }
}

impl ConnectionRegistry for EventBusTransport {
    fn open(&self) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let socket = Arc::new(BusSocket::new(Arc::clone(&self.bus), tx));
        let connection_id = socket.id();
        self.sockets.insert(connection_id, socket);
        info!("Bus socket opened: {}", connection_id);
        (connection_id, rx)
    }

    fn close(&self, connection_id: &ConnectionId) {
        if let Some((_, socket)) = self.sockets.remove(connection_id) {
            socket.leave_all();
            info!("Bus socket closed: {}", connection_id);
        }
    }

    fn join_room(&self, connection_id: &ConnectionId, room_id: &RoomId) {
        match self.socket(connection_id) {
            Some(socket) => socket.join(room_id),
            None => debug!("Ignoring room join for unknown socket {}", connection_id),
        }
    }

    fn leave_room(&self, connection_id: &ConnectionId, room_id: &RoomId) {
        if let Some(socket) = self.socket(connection_id) {
            socket.leave(room_id);
        }
    }
}
