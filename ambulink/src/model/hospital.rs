//! Hospital candidates.

use serde::{Deserialize, Serialize};

use super::position::LatLng;

/// A hospital the driver can route the patient to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Road distance from the query position, when the lookup provides it.
    #[serde(default)]
    pub distance: Option<f64>,
}

impl Hospital {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}
