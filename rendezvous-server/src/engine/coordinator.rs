use super::room_gate::RoomGate;
use super::{Dispatch, JoinPolicy};
use crate::error::{SignalingError, StoreError};
use crate::storage::RoomStore;
use crate::transport::SignalTransport;
use futures::FutureExt;
use rendezvous_core::{
    ConnectionId, ErrorCode, Negotiation, NegotiationKind, Participant, ParticipantId, PeerSummary,
    Room, RoomId, RoomInfo, SignalingMessage, now_millis, query,
};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

const CREATE_ROOM_ATTEMPTS: usize = 8;

/// The signaling coordination engine.
///
/// Holds no room state: every operation re-reads the [`RoomStore`] and every
/// outbound message goes through the [`SignalTransport`]. Read-modify-write
/// sequences against one room are serialized through a per-room gate.
pub struct Coordinator {
    store: Arc<dyn RoomStore>,
    transport: Arc<dyn SignalTransport>,
    gate: RoomGate,
    join_policy: JoinPolicy,
}

impl Coordinator {
    pub fn new(store: Arc<dyn RoomStore>, transport: Arc<dyn SignalTransport>) -> Self {
        Self {
            store,
            transport,
            gate: RoomGate::default(),
            join_policy: JoinPolicy::default(),
        }
    }

    pub fn with_join_policy(mut self, join_policy: JoinPolicy) -> Self {
        self.join_policy = join_policy;
        self
    }

    pub fn join_policy(&self) -> JoinPolicy {
        self.join_policy
    }

    /// Handles one inbound message from `connection_id`.
    ///
    /// Never fails: every error, including a panic inside a backend, ends in
    /// an error reply to the sender and [`Dispatch::Rejected`].
    #[instrument(skip_all, fields(connection = %connection_id, kind = message.kind()))]
    pub async fn handle_message(
        &self,
        connection_id: &ConnectionId,
        message: SignalingMessage,
    ) -> Dispatch {
        let outcome = AssertUnwindSafe(self.dispatch(connection_id, message))
            .catch_unwind()
            .await;

        let err = match outcome {
            Ok(Ok(dispatch)) => return dispatch,
            Ok(Err(err)) => err,
            Err(_) => {
                error!("Dispatch panicked");
                SignalingError::Internal
            }
        };

        self.reject(connection_id, &err).await;
        Dispatch::Rejected
    }

    /// Sends the error reply for `err` to the connection.
    pub async fn reject(&self, connection_id: &ConnectionId, err: &SignalingError) {
        match err.code() {
            ErrorCode::Internal => error!("Rejecting message from {}: {}", connection_id, err),
            _ => debug!("Rejecting message from {}: {}", connection_id, err),
        }

        let reply = SignalingMessage::error(err.code(), err.client_message());
        if let Err(e) = self.transport.send(connection_id, &reply).await {
            warn!("Could not deliver error reply to {}: {}", connection_id, e);
        }
    }

    /// Removes the connection's seat from every room it occupies.
    ///
    /// Returns the seats that were given up. A room that fails is logged and
    /// skipped; the remaining rooms are still processed. Calling it again for
    /// the same connection finds nothing.
    #[instrument(skip_all, fields(connection = %connection_id))]
    pub async fn handle_disconnect(&self, connection_id: &ConnectionId) -> Vec<(RoomId, ParticipantId)> {
        let room_ids = match self.store.get_room_list().await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Cannot list rooms for disconnect of {}: {}", connection_id, e);
                return Vec::new();
            }
        };

        let mut vacated = Vec::new();
        for room_id in room_ids {
            let released = AssertUnwindSafe(self.release_seat(&room_id, connection_id))
                .catch_unwind()
                .await;
            match released {
                Ok(Ok(Some(user_id))) => vacated.push((room_id, user_id)),
                Ok(Ok(None)) => {}
                Ok(Err(e)) => warn!("Disconnect cleanup failed in room {}: {}", room_id, e),
                Err(_) => error!("Disconnect cleanup panicked in room {}", room_id),
            }
        }

        if !vacated.is_empty() {
            info!(
                "Connection {} disconnected, left {} room(s)",
                connection_id,
                vacated.len()
            );
        }
        vacated
    }

    /// Allocates and persists an empty room under a fresh id.
    pub async fn create_room(&self) -> Result<RoomId, SignalingError> {
        for _ in 0..CREATE_ROOM_ATTEMPTS {
            let room = Room::new(RoomId::new(), now_millis());
            let room_id = room.id.clone();
            match self.store.create_room(room).await {
                Ok(()) => {
                    info!("Room created: {}", room_id);
                    return Ok(room_id);
                }
                Err(StoreError::RoomExists(_)) => {
                    warn!("Generated room id {} collided, retrying", room_id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        error!("Gave up allocating a room id");
        Err(SignalingError::Internal)
    }

    /// `Ok(None)` when the room does not exist.
    pub async fn get_room_info(&self, room_id: &RoomId) -> Result<Option<RoomInfo>, SignalingError> {
        let room = self.store.get_room(room_id).await?;
        Ok(room.as_ref().map(RoomInfo::from))
    }

    /// Deletes empty rooms older than `max_idle`. Returns how many went.
    pub async fn sweep_idle_rooms(&self, max_idle: Duration) -> Result<usize, SignalingError> {
        let mut removed = 0;
        for room_id in self.store.get_room_list().await? {
            let _pass = self.gate.enter(&room_id).await;

            let Some(room) = self.store.get_room(&room_id).await? else {
                continue;
            };
            if !query::is_empty(&room) || !query::is_stale(&room, max_idle, now_millis()) {
                continue;
            }

            if self.store.delete_room(&room_id).await? {
                debug!(
                    "Swept idle room {} (age {:?})",
                    room_id,
                    query::room_age(&room, now_millis())
                );
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Vacates every persisted seat, deleting rooms that end up empty.
    ///
    /// Meant for startup, before any connection is accepted: a seat that
    /// outlived its process is bound to a connection that can never
    /// disconnect. Nobody is notified. Returns how many seats were freed.
    pub async fn reclaim_stale_seats(&self) -> Result<usize, SignalingError> {
        let mut reclaimed = 0;
        for room_id in self.store.get_room_list().await? {
            let _pass = self.gate.enter(&room_id).await;

            let Some(room) = self.store.get_room(&room_id).await? else {
                continue;
            };
            for user_id in room.participants.keys() {
                self.vacate(&room_id, user_id).await?;
                reclaimed += 1;
            }
        }

        if reclaimed > 0 {
            info!("Reclaimed {} seat(s) left over from a previous run", reclaimed);
        }
        Ok(reclaimed)
    }

    async fn dispatch(
        &self,
        connection_id: &ConnectionId,
        message: SignalingMessage,
    ) -> Result<Dispatch, SignalingError> {
        match message {
            SignalingMessage::JoinRoom {
                room_id,
                user_id,
                metadata,
            } => self.join(connection_id, room_id, user_id, metadata).await,
            SignalingMessage::LeaveRoom { room_id, user_id } => {
                self.leave(connection_id, room_id, user_id).await
            }
            SignalingMessage::Offer(negotiation) => {
                self.relay(connection_id, NegotiationKind::Offer, negotiation)
                    .await
            }
            SignalingMessage::Answer(negotiation) => {
                self.relay(connection_id, NegotiationKind::Answer, negotiation)
                    .await
            }
            SignalingMessage::IceCandidate(negotiation) => {
                self.relay(connection_id, NegotiationKind::IceCandidate, negotiation)
                    .await
            }
            other => {
                debug!("Refusing {} from a client", other.kind());
                Err(SignalingError::UnknownMessageType)
            }
        }
    }

    async fn join(
        &self,
        connection_id: &ConnectionId,
        room_id: Option<RoomId>,
        user_id: Option<ParticipantId>,
        metadata: Option<Value>,
    ) -> Result<Dispatch, SignalingError> {
        let room_id = required_room(room_id)?;
        let user_id = match user_id {
            Some(id) if !id.is_well_formed() => {
                return Err(SignalingError::validation("invalid userId"));
            }
            Some(id) => id,
            None => ParticipantId::new(),
        };

        let others = {
            let _pass = self.gate.enter(&room_id).await;

            let room = match self.store.get_room(&room_id).await? {
                Some(room) => room,
                None => self.room_for_unknown_join(&room_id).await?,
            };

            if query::find_by_connection(&room, connection_id).is_some() {
                return Err(SignalingError::validation("already joined this room"));
            }
            if room.participants.contains_key(&user_id) {
                return Err(SignalingError::validation("userId already taken in this room"));
            }

            // Snapshot as read at admission, before our own seat exists.
            let others = query::other_participants(&room, &user_id);
            let participant =
                Participant::new(user_id.clone(), *connection_id, now_millis()).with_metadata(metadata);
            self.store.add_participant(&room_id, participant).await?;
            others
        };

        info!("{} joined room {} ({} already present)", user_id, room_id, others.len());

        let reply = SignalingMessage::RoomJoined {
            room_id: room_id.clone(),
            user_id: user_id.clone(),
            participants: others
                .into_iter()
                .map(|user_id| PeerSummary { user_id })
                .collect(),
        };
        self.notify_sender(connection_id, &reply).await;

        let announce = SignalingMessage::UserJoined {
            room_id: room_id.clone(),
            user_id: user_id.clone(),
        };
        self.notify_room(&room_id, &announce, connection_id).await;

        Ok(Dispatch::Joined { room_id, user_id })
    }

    async fn room_for_unknown_join(&self, room_id: &RoomId) -> Result<Room, SignalingError> {
        match self.join_policy {
            JoinPolicy::RequireExisting => Err(SignalingError::RoomNotFound),
            JoinPolicy::CreateOnJoin => {
                let room = Room::new(room_id.clone(), now_millis());
                self.store.create_room(room.clone()).await?;
                info!("Room {} created on first join", room_id);
                Ok(room)
            }
        }
    }

    async fn leave(
        &self,
        connection_id: &ConnectionId,
        room_id: Option<RoomId>,
        user_id: Option<ParticipantId>,
    ) -> Result<Dispatch, SignalingError> {
        let room_id = required_room(room_id)?;
        let user_id = user_id.ok_or_else(|| SignalingError::validation("userId is required"))?;

        {
            let _pass = self.gate.enter(&room_id).await;

            let room = self
                .store
                .get_room(&room_id)
                .await?
                .ok_or(SignalingError::RoomNotFound)?;
            match room.participants.get(&user_id) {
                Some(seat) if seat.connection_id == *connection_id => {}
                _ => return Err(SignalingError::NotInRoom),
            }

            self.vacate(&room_id, &user_id).await?;
        }

        let announce = SignalingMessage::UserLeft {
            room_id: room_id.clone(),
            user_id: user_id.clone(),
        };
        self.notify_room(&room_id, &announce, connection_id).await;

        Ok(Dispatch::Left { room_id, user_id })
    }

    async fn relay(
        &self,
        connection_id: &ConnectionId,
        kind: NegotiationKind,
        negotiation: Negotiation,
    ) -> Result<Dispatch, SignalingError> {
        let room_id = required_room(negotiation.room_id)?;

        let room = self
            .store
            .get_room(&room_id)
            .await?
            .ok_or(SignalingError::RoomNotFound)?;
        // The bound seat is authoritative; a claimed userId is ignored.
        let sender = query::find_by_connection(&room, connection_id).ok_or(SignalingError::NotInRoom)?;

        let target = match &negotiation.target_user_id {
            Some(target_id) => Some(
                room.participants
                    .get(target_id)
                    .ok_or(SignalingError::TargetNotFound)?,
            ),
            None => None,
        };

        let outbound = kind.wrap(Negotiation {
            room_id: Some(room_id.clone()),
            user_id: Some(sender.id.clone()),
            target_user_id: negotiation.target_user_id.clone(),
            payload: negotiation.payload,
        });

        match target {
            Some(target) => {
                self.transport
                    .send(&target.connection_id, &outbound)
                    .await?;
                debug!("Relayed {} from {} to {}", outbound.kind(), sender.id, target.id);
            }
            None => {
                self.transport
                    .broadcast(&room_id, &outbound, Some(connection_id))
                    .await?;
                debug!("Relayed {} from {} to room {}", outbound.kind(), sender.id, room_id);
            }
        }

        Ok(Dispatch::Relayed)
    }

    /// Gives up the connection's seat in one room, if it has one.
    async fn release_seat(
        &self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
    ) -> Result<Option<ParticipantId>, SignalingError> {
        let user_id = {
            let _pass = self.gate.enter(room_id).await;

            let Some(room) = self.store.get_room(room_id).await? else {
                return Ok(None);
            };
            let Some(seat) = query::find_by_connection(&room, connection_id) else {
                return Ok(None);
            };
            let user_id = seat.id.clone();

            self.vacate(room_id, &user_id).await?;
            user_id
        };

        let announce = SignalingMessage::UserLeft {
            room_id: room_id.clone(),
            user_id: user_id.clone(),
        };
        self.notify_room(room_id, &announce, connection_id).await;

        Ok(Some(user_id))
    }

    /// Removes the seat and deletes the room if that emptied it. Caller holds
    /// the room's pass.
    async fn vacate(&self, room_id: &RoomId, user_id: &ParticipantId) -> Result<(), SignalingError> {
        let remaining = self.store.remove_participant(room_id, user_id).await?;
        info!("{} left room {}", user_id, room_id);

        if query::is_empty(&remaining) {
            self.store.delete_room(room_id).await?;
            info!("Room {} is empty, deleted", room_id);
        }
        Ok(())
    }

    // Notifications after a committed mutation are best-effort: the seat
    // change stands even if they cannot be delivered.

    async fn notify_sender(&self, connection_id: &ConnectionId, message: &SignalingMessage) {
        if let Err(e) = self.transport.send(connection_id, message).await {
            error!("Failed to send {} to {}: {}", message.kind(), connection_id, e);
        }
    }

    async fn notify_room(
        &self,
        room_id: &RoomId,
        message: &SignalingMessage,
        exclude: &ConnectionId,
    ) {
        if let Err(e) = self.transport.broadcast(room_id, message, Some(exclude)).await {
            error!("Failed to broadcast {} to room {}: {}", message.kind(), room_id, e);
        }
    }
}

fn required_room(room_id: Option<RoomId>) -> Result<RoomId, SignalingError> {
    let room_id = room_id.ok_or_else(|| SignalingError::validation("roomId is required"))?;
    if !room_id.is_well_formed() {
        return Err(SignalingError::validation("invalid roomId"));
    }
    Ok(room_id)
}
