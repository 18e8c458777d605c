//! Route types.
//!
//! The server ships routes as a [`RoutePayload`] whose geometry is an encoded
//! polyline. [`Route::from_payload`] is the only place a payload is decoded;
//! routes are immutable afterwards and replaced wholesale on every update.

use serde::{Deserialize, Serialize};

use super::position::LatLng;
use crate::polyline;

/// Wire form of a route as carried by channel events and HTTP responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePayload {
    /// Encoded polyline geometry.
    #[serde(default)]
    pub polyline: String,
    /// Total distance in meters.
    #[serde(default)]
    pub distance: f64,
    /// Total duration in seconds.
    #[serde(default)]
    pub duration: f64,
    /// Turn-by-turn steps, if the server included them.
    #[serde(default)]
    pub steps: Vec<RouteStep>,
}

/// One turn-by-turn instruction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    #[serde(default)]
    pub instruction: String,
    /// Step distance in meters.
    #[serde(default)]
    pub distance: f64,
    /// Step duration in seconds.
    #[serde(default)]
    pub duration: f64,
}

/// A decoded route.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Ordered route geometry.
    pub points: Vec<LatLng>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub steps: Vec<RouteStep>,
}

impl Route {
    /// Decode a wire payload.
    ///
    /// Returns `None` when the polyline is empty or cannot be decoded; a
    /// route without geometry is treated as no route at all.
    pub fn from_payload(payload: &RoutePayload) -> Option<Self> {
        let points = match polyline::decode(&payload.polyline) {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding route with undecodable polyline");
                return None;
            }
        };

        if points.is_empty() {
            tracing::debug!("Route payload has no geometry");
            return None;
        }

        Some(Self {
            points,
            distance_meters: payload.distance,
            duration_seconds: payload.duration,
            steps: payload.steps.clone(),
        })
    }

    /// Number of points in the route geometry.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}
