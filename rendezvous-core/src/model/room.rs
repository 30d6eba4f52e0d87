use crate::model::{Participant, ParticipantId, Timestamp, is_well_formed_id};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

const MAX_ROOM_ID_LEN: usize = 128;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accepts `[A-Za-z0-9_-]`, at most 128 chars. Storage backends rely on
    /// this to use the id as a file or key name verbatim.
    pub fn parse(raw: &str) -> Option<Self> {
        is_well_formed_id(raw, MAX_ROOM_ID_LEN).then(|| Self(raw.to_owned()))
    }

    pub fn is_well_formed(&self) -> bool {
        is_well_formed_id(&self.0, MAX_ROOM_ID_LEN)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named presence scope. A room with no participants is deleted by the
/// engine as soon as its last participant is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub created_at: Timestamp,
    pub participants: HashMap<ParticipantId, Participant>,
}

impl Room {
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self {
            id,
            created_at,
            participants: HashMap::new(),
        }
    }

    /// Inserts or replaces the seat keyed by the participant's id.
    pub fn seat(&mut self, participant: Participant) -> Option<Participant> {
        self.participants.insert(participant.id.clone(), participant)
    }

    pub fn unseat(&mut self, participant_id: &ParticipantId) -> Option<Participant> {
        self.participants.remove(participant_id)
    }
}

/// Read-only projection handed to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub created_at: Timestamp,
    pub participant_count: usize,
    pub participants: Vec<ParticipantInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub user_id: ParticipantId,
    pub joined_at: Timestamp,
}

impl From<&Room> for RoomInfo {
    fn from(room: &Room) -> Self {
        let mut participants: Vec<ParticipantInfo> = room
            .participants
            .values()
            .map(|p| ParticipantInfo {
                user_id: p.id.clone(),
                joined_at: p.joined_at,
            })
            .collect();
        participants.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        Self {
            room_id: room.id.clone(),
            created_at: room.created_at,
            participant_count: participants.len(),
            participants,
        }
    }
}
