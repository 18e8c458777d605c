//! Channel wire frames.
//!
//! Every message in either direction is one JSON text frame:
//! `{"event": "call.offer", "data": {...}}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::ChannelError;

/// One named event and its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Build a frame from a serializable payload.
    pub fn from_payload<T: Serialize>(
        event: impl Into<String>,
        payload: &T,
    ) -> Result<Self, ChannelError> {
        let data =
            serde_json::to_value(payload).map_err(|e| ChannelError::Malformed(e.to_string()))?;
        Ok(Self::new(event, data))
    }

    /// Parse a text frame.
    pub fn decode(text: &str) -> Result<Self, ChannelError> {
        serde_json::from_str(text).map_err(|e| ChannelError::Malformed(e.to_string()))
    }

    /// Serialize to a text frame.
    pub fn encode(&self) -> Result<String, ChannelError> {
        serde_json::to_string(self).map_err(|e| ChannelError::Malformed(e.to_string()))
    }

    /// Decode the payload into an event type.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ChannelError> {
        T::deserialize(&self.data)
            .map_err(|e| ChannelError::Malformed(format!("{}: {}", self.event, e)))
    }
}
