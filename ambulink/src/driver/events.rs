//! Wire payloads of the driver namespace.

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelError, Frame};
use crate::model::{string_or_number, CallOffer, RoutePayload};

pub const CALL_OFFER: &str = "call.offer";
pub const CALL_ROUTE: &str = "call.route";
pub const ROUTE_UPDATE: &str = "route.update";
pub const LOCATION_REQUEST: &str = "location.request";

pub const CALL_RESPOND: &str = "call.respond";
pub const CALL_COMPLETE: &str = "call.complete";
pub const LOCATION_UPDATE: &str = "location.update";
pub const LOCATION_RESPONSE: &str = "location.response";

/// `call.route` and `route.update`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEvent {
    pub call_id: String,
    #[serde(default)]
    pub route: Option<RoutePayload>,
}

/// `location.request`: the server wants a fresh fix.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    #[serde(deserialize_with = "string_or_number")]
    pub request_id: String,
}

/// Inbound driver events.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    Offer(CallOffer),
    Route(RouteEvent),
    RouteUpdate(RouteEvent),
    LocationRequest(LocationRequest),
}

impl DriverEvent {
    /// Decode a frame. Unknown event names yield `Ok(None)`.
    pub fn from_frame(frame: &Frame) -> Result<Option<Self>, ChannelError> {
        let event = match frame.event.as_str() {
            CALL_OFFER => Self::Offer(frame.payload()?),
            CALL_ROUTE => Self::Route(frame.payload()?),
            ROUTE_UPDATE => Self::RouteUpdate(frame.payload()?),
            LOCATION_REQUEST => Self::LocationRequest(frame.payload()?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResponse {
    pub call_id: String,
    pub accept: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallComplete {
    pub call_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    pub call_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub request_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_route_event() {
        let frame = Frame::new(
            CALL_ROUTE,
            json!({
                "callId": "c1",
                "route": {"polyline": "_p~iF~ps|U", "distance": 1200, "duration": 300, "steps": []}
            }),
        );
        match DriverEvent::from_frame(&frame).unwrap() {
            Some(DriverEvent::Route(event)) => {
                assert_eq!(event.call_id, "c1");
                assert_eq!(event.route.unwrap().distance, 1200.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_location_request_numeric_id() {
        let frame = Frame::new(LOCATION_REQUEST, json!({"requestId": 17}));
        assert_eq!(
            DriverEvent::from_frame(&frame).unwrap(),
            Some(DriverEvent::LocationRequest(LocationRequest {
                request_id: "17".to_string()
            }))
        );
    }

    #[test]
    fn test_unknown_event_ignored() {
        let frame = Frame::new("driver.stats", json!({}));
        assert_eq!(DriverEvent::from_frame(&frame).unwrap(), None);
    }

    #[test]
    fn test_bad_offer_is_malformed() {
        let frame = Frame::new(CALL_OFFER, json!({"description": "no id"}));
        assert!(matches!(
            DriverEvent::from_frame(&frame),
            Err(ChannelError::Malformed(_))
        ));
    }

    #[test]
    fn test_outbound_wire_names() {
        let update = LocationUpdate {
            call_id: "c1".to_string(),
            latitude: 1.5,
            longitude: 2.5,
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"callId": "c1", "latitude": 1.5, "longitude": 2.5})
        );
        let respond = CallResponse {
            call_id: "c1".to_string(),
            accept: false,
        };
        assert_eq!(
            serde_json::to_value(&respond).unwrap(),
            json!({"callId": "c1", "accept": false})
        );
    }
}
