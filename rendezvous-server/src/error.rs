use rendezvous_core::{ErrorCode, RoomId};
use thiserror::Error;

/// Failures raised by a [`RoomStore`](crate::storage::RoomStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("room {0} already exists")]
    RoomExists(RoomId),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("room record encoding failed: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("room record is corrupt: {0}")]
    Corrupt(String),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Failures raised by a [`SignalTransport`](crate::transport::SignalTransport).
/// Dead connections are not failures; they are skipped.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode frame: {0}")]
    Encode(#[from] FrameError),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed message: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("failed to serialize message: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Everything that can end the handling of one inbound message.
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("{0}")]
    Validation(String),

    #[error("unknown message type")]
    UnknownMessageType,

    #[error("room not found")]
    RoomNotFound,

    #[error("not in this room")]
    NotInRoom,

    #[error("target user not in this room")]
    TargetNotFound,

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("request timed out")]
    Timeout,

    #[error("internal error")]
    Internal,
}

impl SignalingError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) | Self::UnknownMessageType => ErrorCode::Validation,
            Self::RoomNotFound | Self::NotInRoom | Self::TargetNotFound => ErrorCode::NotFound,
            Self::Store(StoreError::RoomNotFound(_)) => ErrorCode::NotFound,
            Self::Store(_) | Self::Transport(_) | Self::Timeout | Self::Internal => {
                ErrorCode::Internal
            }
        }
    }

    /// Text sent to the client. Adapter fault details stay in the logs.
    pub fn client_message(&self) -> String {
        match self.code() {
            ErrorCode::Internal => "internal error".to_owned(),
            ErrorCode::NotFound if matches!(self, Self::Store(_)) => "room not found".to_owned(),
            _ => self.to_string(),
        }
    }
}

impl From<FrameError> for SignalingError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Malformed(_) => Self::Validation(e.to_string()),
            FrameError::Serialize(_) => Self::Transport(TransportError::Encode(e)),
        }
    }
}
