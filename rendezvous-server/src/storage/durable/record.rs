//! On-disk shape of a durable room.
//!
//! The participant mapping is flattened into a list of entries, sorted by
//! participant id so rewrites of an unchanged room are byte-identical.

use crate::error::StoreError;
use rendezvous_core::{ConnectionId, Participant, ParticipantId, Room, RoomId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub(crate) const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomRecord {
    version: u32,
    room_id: String,
    created_at: Timestamp,
    participants: Vec<ParticipantRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantRecord {
    participant_id: String,
    connection_id: String,
    joined_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
}

impl From<&Room> for RoomRecord {
    fn from(room: &Room) -> Self {
        let mut participants: Vec<ParticipantRecord> = room
            .participants
            .values()
            .map(|p| ParticipantRecord {
                participant_id: p.id.as_str().to_owned(),
                connection_id: p.connection_id.to_string(),
                joined_at: p.joined_at,
                metadata: p.metadata.clone(),
            })
            .collect();
        participants.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));

        Self {
            version: SCHEMA_VERSION,
            room_id: room.id.as_str().to_owned(),
            created_at: room.created_at,
            participants,
        }
    }
}

impl TryFrom<RoomRecord> for Room {
    type Error = StoreError;

    fn try_from(record: RoomRecord) -> Result<Self, Self::Error> {
        if record.version != SCHEMA_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported schema version {}",
                record.version
            )));
        }

        let id = RoomId::parse(&record.room_id)
            .ok_or_else(|| StoreError::Corrupt(format!("bad room id {:?}", record.room_id)))?;

        let mut participants = HashMap::with_capacity(record.participants.len());
        for entry in record.participants {
            let participant_id = ParticipantId::parse(&entry.participant_id).ok_or_else(|| {
                StoreError::Corrupt(format!("bad participant id {:?}", entry.participant_id))
            })?;
            let connection_id: ConnectionId = entry.connection_id.parse().map_err(|e| {
                StoreError::Corrupt(format!("bad connection id {:?}: {e}", entry.connection_id))
            })?;

            let participant = Participant {
                id: participant_id.clone(),
                connection_id,
                joined_at: entry.joined_at,
                metadata: entry.metadata,
            };
            if participants.insert(participant_id, participant).is_some() {
                return Err(StoreError::Corrupt(format!(
                    "duplicate participant {:?} in room {id}",
                    entry.participant_id
                )));
            }
        }

        Ok(Room {
            id,
            created_at: record.created_at,
            participants,
        })
    }
}

pub(crate) fn encode(room: &Room) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec_pretty(&RoomRecord::from(room))?)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Room, StoreError> {
    let record: RoomRecord = serde_json::from_slice(bytes)?;
    Room::try_from(record)
}
