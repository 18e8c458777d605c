//! Wire payloads of the rider namespace.

use serde::Deserialize;

use crate::channel::{ChannelError, Frame};
use crate::model::{string_or_number, LatLng, RoutePayload};

pub const CALL_DISPATCHED: &str = "call.dispatched";
pub const AMBULANCE_LOCATION: &str = "ambulance.location";
pub const CALL_STATUS: &str = "call.status";

/// `call.dispatched`: an ambulance was assigned.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispatched {
    pub call_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub ambulance_id: String,
    #[serde(default)]
    pub ambulance_location: Option<LatLng>,
    #[serde(default)]
    pub route: Option<RoutePayload>,
}

/// `ambulance.location`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbulanceLocation {
    pub call_id: String,
    pub ambulance_location: LatLng,
    #[serde(default)]
    pub route: Option<RoutePayload>,
}

/// `call.status`. The token is parsed by the session so unknown values
/// can be reported with the raw text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub call_id: String,
    pub status: String,
}

/// Inbound rider events.
#[derive(Debug, Clone, PartialEq)]
pub enum RiderEvent {
    Dispatched(Dispatched),
    AmbulanceLocation(AmbulanceLocation),
    Status(StatusChange),
}

impl RiderEvent {
    /// Decode a frame. Unknown event names yield `Ok(None)`.
    pub fn from_frame(frame: &Frame) -> Result<Option<Self>, ChannelError> {
        let event = match frame.event.as_str() {
            CALL_DISPATCHED => Self::Dispatched(frame.payload()?),
            AMBULANCE_LOCATION => Self::AmbulanceLocation(frame.payload()?),
            CALL_STATUS => Self::Status(frame.payload()?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}
