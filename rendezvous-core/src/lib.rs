pub mod model;
pub mod query;

pub use model::{
    ConnectionId, ErrorCode, Negotiation, NegotiationKind, Participant, ParticipantId,
    ParticipantInfo, PeerSummary, Room, RoomId, RoomInfo, SignalingMessage, Timestamp,
    now_millis,
};
