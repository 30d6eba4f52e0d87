use crate::model::{Timestamp, is_well_formed_id};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const MAX_PARTICIPANT_ID_LEN: usize = 64;

/// Logical identity of a room occupant. Either supplied by the client on
/// join or generated by the engine.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accepts `[A-Za-z0-9_-]`, at most 64 chars.
    pub fn parse(raw: &str) -> Option<Self> {
        is_well_formed_id(raw, MAX_PARTICIPANT_ID_LEN).then(|| Self(raw.to_owned()))
    }

    pub fn is_well_formed(&self) -> bool {
        is_well_formed_id(&self.0, MAX_PARTICIPANT_ID_LEN)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport-assigned handle of one live session.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One seat in a room, bound to exactly one live connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub connection_id: ConnectionId,
    pub joined_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Participant {
    pub fn new(id: ParticipantId, connection_id: ConnectionId, joined_at: Timestamp) -> Self {
        Self {
            id,
            connection_id,
            joined_at,
            metadata: None,
        }
    }

    /// JSON `null` is stored as absent metadata.
    pub fn with_metadata(mut self, metadata: Option<Value>) -> Self {
        self.metadata = metadata.filter(|m| !m.is_null());
        self
    }
}
