//! Stateless predicates over a [`Room`] snapshot.
//!
//! Used by the engine for its post-removal emptiness check and by the
//! idle-room sweeper.

use crate::model::{ConnectionId, Participant, ParticipantId, Room, Timestamp};
use std::time::Duration;

pub fn is_empty(room: &Room) -> bool {
    room.participants.is_empty()
}

pub fn participant_count(room: &Room) -> usize {
    room.participants.len()
}

pub fn find_by_connection<'a>(room: &'a Room, connection_id: &ConnectionId) -> Option<&'a Participant> {
    room.participants
        .values()
        .find(|p| p.connection_id == *connection_id)
}

/// Ids of everyone in the room except `excluded`.
pub fn other_participants(room: &Room, excluded: &ParticipantId) -> Vec<ParticipantId> {
    let mut others: Vec<&Participant> = room
        .participants
        .values()
        .filter(|p| p.id != *excluded)
        .collect();
    others.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));
    others.into_iter().map(|p| p.id.clone()).collect()
}

/// Zero when `now` precedes the creation time (clock skew between nodes).
pub fn room_age(room: &Room, now: Timestamp) -> Duration {
    Duration::from_millis(now.saturating_sub(room.created_at))
}

pub fn is_stale(room: &Room, threshold: Duration, now: Timestamp) -> bool {
    room_age(room, now) > threshold
}
