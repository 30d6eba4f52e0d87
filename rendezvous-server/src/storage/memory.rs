use crate::error::StoreError;
use crate::storage::RoomStore;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rendezvous_core::{Participant, ParticipantId, Room, RoomId};

/// Process-lifetime room store. Everything is lost on restart.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: DashMap<RoomId, Room>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn create_room(&self, room: Room) -> Result<(), StoreError> {
        match self.rooms.entry(room.id.clone()) {
            Entry::Occupied(entry) => Err(StoreError::RoomExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(room);
                Ok(())
            }
        }
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.get(room_id).map(|room| room.clone()))
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<bool, StoreError> {
        Ok(self.rooms.remove(room_id).is_some())
    }

    async fn add_participant(
        &self,
        room_id: &RoomId,
        participant: Participant,
    ) -> Result<(), StoreError> {
        let mut room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        room.seat(participant);
        Ok(())
    }

    async fn remove_participant(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<Room, StoreError> {
        let mut room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        room.unseat(participant_id);
        Ok(room.clone())
    }

    async fn get_room_list(&self) -> Result<Vec<RoomId>, StoreError> {
        Ok(self.rooms.iter().map(|entry| entry.key().clone()).collect())
    }
}
