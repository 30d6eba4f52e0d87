mod participant;
mod room;
mod signaling;

pub use participant::{ConnectionId, Participant, ParticipantId};
pub use room::{ParticipantInfo, Room, RoomId, RoomInfo};
pub use signaling::{ErrorCode, Negotiation, NegotiationKind, PeerSummary, SignalingMessage};

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or_default()
}

fn is_well_formed_id(raw: &str, max_len: usize) -> bool {
    !raw.is_empty()
        && raw.len() <= max_len
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
