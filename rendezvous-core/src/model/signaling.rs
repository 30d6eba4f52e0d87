use crate::model::{ParticipantId, RoomId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire message exchanged between clients and the coordination engine.
///
/// Encoded as a JSON object tagged by `"type"`. Fields a kind needs on the
/// way in are optional so that a missing room or user id surfaces as a
/// validation error instead of a decode failure. Any tag not listed here
/// decodes to [`SignalingMessage::Unknown`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SignalingMessage {
    JoinRoom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<ParticipantId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
    },
    LeaveRoom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<ParticipantId>,
    },
    RoomJoined {
        room_id: RoomId,
        user_id: ParticipantId,
        participants: Vec<PeerSummary>,
    },
    RoomParticipants {
        room_id: RoomId,
        participants: Vec<PeerSummary>,
    },
    UserJoined {
        room_id: RoomId,
        user_id: ParticipantId,
    },
    UserLeft {
        room_id: RoomId,
        user_id: ParticipantId,
    },
    Offer(Negotiation),
    Answer(Negotiation),
    IceCandidate(Negotiation),
    Error {
        message: String,
        code: ErrorCode,
    },
    #[serde(other)]
    Unknown,
}

impl SignalingMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code,
        }
    }

    /// Wire name of the message kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::LeaveRoom { .. } => "leave-room",
            Self::RoomJoined { .. } => "room-joined",
            Self::RoomParticipants { .. } => "room-participants",
            Self::UserJoined { .. } => "user-joined",
            Self::UserLeft { .. } => "user-left",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::IceCandidate(_) => "ice-candidate",
            Self::Error { .. } => "error",
            Self::Unknown => "unknown",
        }
    }
}

/// Shared shape of offer, answer and ice-candidate. `payload` is relayed
/// as-is and never inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Negotiation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<ParticipantId>,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationKind {
    Offer,
    Answer,
    IceCandidate,
}

impl NegotiationKind {
    pub fn wrap(self, negotiation: Negotiation) -> SignalingMessage {
        match self {
            Self::Offer => SignalingMessage::Offer(negotiation),
            Self::Answer => SignalingMessage::Answer(negotiation),
            Self::IceCandidate => SignalingMessage::IceCandidate(negotiation),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerSummary {
    pub user_id: ParticipantId,
}

/// Category carried by error replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    Validation,
    NotFound,
    Internal,
}
