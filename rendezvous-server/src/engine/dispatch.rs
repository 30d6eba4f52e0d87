use rendezvous_core::{ParticipantId, RoomId};
use std::fmt;
use std::str::FromStr;

/// What a join-room naming an unknown room does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    /// Reply "room not found". Rooms come from `create_room` only.
    #[default]
    RequireExisting,
    /// Create the room on the spot and seat the joiner.
    CreateOnJoin,
}

impl FromStr for JoinPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "require-existing" => Ok(Self::RequireExisting),
            "create-on-join" => Ok(Self::CreateOnJoin),
            other => Err(format!(
                "expected require-existing or create-on-join, got {other:?}"
            )),
        }
    }
}

impl fmt::Display for JoinPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RequireExisting => "require-existing",
            Self::CreateOnJoin => "create-on-join",
        })
    }
}

/// Result of handling one inbound message, as seen by the session glue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The connection now holds a seat in the room.
    Joined {
        room_id: RoomId,
        user_id: ParticipantId,
    },
    /// The connection gave up its seat in the room.
    Left {
        room_id: RoomId,
        user_id: ParticipantId,
    },
    Relayed,
    /// The sender was sent an error reply.
    Rejected,
}
