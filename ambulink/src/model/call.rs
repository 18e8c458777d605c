//! Call lifecycle types.
//!
//! [`CallState`] is the client-side projection of one call. The transitions
//! that mutate it live in [`crate::call`]; this module only defines the data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::hospital::Hospital;
use super::position::LatLng;
use super::route::Route;

/// Status of a call.
///
/// `Pending`, `Dispatched` and `EnRoute` are the "ambulance assigned, not yet
/// arrived" phase; the rider may observe any of the three for the same leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Pending,
    Dispatched,
    EnRoute,
    Arrived,
    NavigatingToHospital,
    Completed,
    Cancelled,
}

/// A status token the client does not recognise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown call status '{0}'")]
pub struct UnknownStatus(pub String);

impl CallStatus {
    /// Parse a server status token.
    ///
    /// Case is ignored, as are the separators `_`, `-`, `.` and spaces, so
    /// `"EN_ROUTE"`, `"en-route"` and `"EnRoute"` are the same status.
    pub fn parse(token: &str) -> Result<Self, UnknownStatus> {
        let normalized: String = token
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | '.' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "dispatched" | "assigned" => Ok(Self::Dispatched),
            "enroute" => Ok(Self::EnRoute),
            "arrived" => Ok(Self::Arrived),
            "navigatingtohospital" => Ok(Self::NavigatingToHospital),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(UnknownStatus(token.to_string())),
        }
    }

    /// True for the assigned-but-not-arrived phase.
    pub fn is_assigned_phase(&self) -> bool {
        matches!(self, Self::Pending | Self::Dispatched | Self::EnRoute)
    }

    /// True for statuses that end the call.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Position in the leg sequence, used to reject backwards transitions.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Dispatched => 1,
            Self::EnRoute => 2,
            Self::Arrived => 3,
            Self::NavigatingToHospital => 4,
            Self::Completed | Self::Cancelled => 5,
        }
    }
}

impl FromStr for CallStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for CallStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Self::parse(&token).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
            Self::EnRoute => "en_route",
            Self::Arrived => "arrived",
            Self::NavigatingToHospital => "navigating_to_hospital",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A call proposed to a driver, awaiting accept or decline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOffer {
    pub call_id: String,
    #[serde(default)]
    pub description: String,
    /// Patient pickup latitude.
    #[serde(rename = "latitude")]
    pub origin_latitude: f64,
    /// Patient pickup longitude.
    #[serde(rename = "longitude")]
    pub origin_longitude: f64,
    /// Road distance to the pickup in meters.
    #[serde(rename = "distance", default)]
    pub distance_meters: f64,
    /// Estimated time to the pickup in seconds.
    #[serde(rename = "duration", default)]
    pub eta_seconds: f64,
    #[serde(default, deserialize_with = "string_or_number")]
    pub priority: String,
}

impl CallOffer {
    pub fn origin(&self) -> LatLng {
        LatLng::new(self.origin_latitude, self.origin_longitude)
    }
}

/// Accepts `"high"` as well as `3` for fields the server types loosely.
pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Client-side projection of the current call.
///
/// `call_id == None` is the idle state; every other field is call-scoped and
/// cleared when the call ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallState {
    pub call_id: Option<String>,
    pub status: Option<CallStatus>,
    /// Ambulance position for riders, pickup position for drivers.
    pub counterpart_position: Option<LatLng>,
    /// Route of the pickup leg.
    pub active_route: Option<Route>,
    pub selected_hospital: Option<Hospital>,
    /// Route of the hospital-bound leg.
    pub hospital_route: Option<Route>,
    pub patient_id: Option<String>,
    /// Last user-visible error, if any.
    pub error: Option<String>,
}

impl CallState {
    pub fn is_idle(&self) -> bool {
        self.call_id.is_none()
    }

    /// True if this state belongs to `call_id`.
    pub fn is_for(&self, call_id: &str) -> bool {
        self.call_id.as_deref() == Some(call_id)
    }

    /// The route of the leg currently being driven.
    pub fn current_route(&self) -> Option<&Route> {
        self.hospital_route.as_ref().or(self.active_route.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_and_separator_insensitive() {
        for token in ["ARRIVED", "Arrived", "arrived", " arrived "] {
            assert_eq!(CallStatus::parse(token), Ok(CallStatus::Arrived));
        }
        for token in ["en_route", "EN-ROUTE", "EnRoute", "en route"] {
            assert_eq!(CallStatus::parse(token), Ok(CallStatus::EnRoute));
        }
        assert_eq!(
            CallStatus::parse("NAVIGATING_TO_HOSPITAL"),
            Ok(CallStatus::NavigatingToHospital)
        );
        assert_eq!(CallStatus::parse("Canceled"), Ok(CallStatus::Cancelled));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            CallStatus::parse("teleported"),
            Err(UnknownStatus("teleported".to_string()))
        );
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let status = CallStatus::NavigatingToHospital;
        assert_eq!(CallStatus::parse(&status.to_string()), Ok(status));
    }

    #[test]
    fn test_phases() {
        assert!(CallStatus::Pending.is_assigned_phase());
        assert!(CallStatus::EnRoute.is_assigned_phase());
        assert!(!CallStatus::Arrived.is_assigned_phase());
        assert!(CallStatus::Cancelled.is_terminal());
        assert!(CallStatus::Arrived.rank() < CallStatus::NavigatingToHospital.rank());
    }

    #[test]
    fn test_offer_deserialize() {
        let json = r#"{
            "callId": "c1",
            "description": "Chest pain",
            "latitude": 6.5244,
            "longitude": 3.3792,
            "distance": 2300,
            "duration": 420,
            "priority": 2
        }"#;

        let offer: CallOffer = serde_json::from_str(json).unwrap();
        assert_eq!(offer.call_id, "c1");
        assert_eq!(offer.distance_meters, 2300.0);
        assert_eq!(offer.eta_seconds, 420.0);
        assert_eq!(offer.priority, "2");
        assert_eq!(offer.origin(), LatLng::new(6.5244, 3.3792));
    }

    #[test]
    fn test_offer_priority_as_label() {
        let json = r#"{"callId": "c9", "latitude": 0, "longitude": 0, "priority": "critical"}"#;
        let offer: CallOffer = serde_json::from_str(json).unwrap();
        assert_eq!(offer.priority, "critical");
        assert!(offer.description.is_empty());
    }

    #[test]
    fn test_default_state_is_idle() {
        let state = CallState::default();
        assert!(state.is_idle());
        assert!(state.current_route().is_none());
    }
}
