//! JSON text framing for [`SignalingMessage`].

use crate::error::FrameError;
use rendezvous_core::SignalingMessage;

pub fn decode(text: &str) -> Result<SignalingMessage, FrameError> {
    serde_json::from_str(text).map_err(FrameError::Malformed)
}

pub fn encode(message: &SignalingMessage) -> Result<String, FrameError> {
    serde_json::to_string(message).map_err(FrameError::Serialize)
}
