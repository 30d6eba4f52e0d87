use crate::error::StoreError;
use async_trait::async_trait;
use rendezvous_core::{Participant, ParticipantId, Room, RoomId};

/// Persistence seam of the coordination engine.
///
/// Every call may be slow and may fail. Nothing is atomic across calls;
/// callers that read then write the same room must serialize themselves.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Fails with [`StoreError::RoomExists`] if the id is taken.
    async fn create_room(&self, room: Room) -> Result<(), StoreError>;

    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError>;

    /// Returns whether a room was removed.
    async fn delete_room(&self, room_id: &RoomId) -> Result<bool, StoreError>;

    /// Seats the participant, replacing any seat with the same participant id.
    async fn add_participant(
        &self,
        room_id: &RoomId,
        participant: Participant,
    ) -> Result<(), StoreError>;

    /// Returns the room as it stands after the removal. The room itself is
    /// left in place even when it becomes empty.
    async fn remove_participant(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<Room, StoreError>;

    async fn get_room_list(&self) -> Result<Vec<RoomId>, StoreError>;
}
