//! Pure call state transitions.

use tracing::debug;

use super::error::{describe, CallError};
use crate::model::{CallState, CallStatus, Hospital, LatLng, Route};

/// One change to the call state, from the server or a local action.
#[derive(Debug, Clone, PartialEq)]
pub enum CallUpdate {
    /// The driver accepted an offer. `pickup` is the patient origin.
    Accepted {
        call_id: String,
        pickup: Option<LatLng>,
    },
    /// An ambulance was assigned to the rider's call.
    Dispatched {
        call_id: String,
        ambulance: Option<LatLng>,
        route: Option<Route>,
    },
    /// The counterpart moved; `route` replaces the current leg's route when present.
    Position {
        call_id: String,
        position: LatLng,
        route: Option<Route>,
    },
    /// A new route for the current leg. `None` means the route was unusable.
    Route {
        call_id: String,
        route: Option<Route>,
    },
    /// Server status change.
    Status { call_id: String, status: CallStatus },
    /// Patient identifier fetched out-of-band.
    PatientIdentified { call_id: String, patient_id: String },
    /// Local: hospital chosen and its route fetched.
    HospitalSelected {
        call_id: String,
        hospital: Hospital,
        route: Option<Route>,
    },
    /// Local: manual status step.
    Advance { call_id: String, status: CallStatus },
    /// Local: the call was completed.
    Complete { call_id: String },
    /// Back to idle.
    Reset,
    /// Surface a user-visible error.
    Error(String),
}

/// Apply `update` to `state`.
///
/// Server updates never fail. Local actions fail without modifying `state`.
pub fn apply(state: &mut CallState, update: CallUpdate) -> Result<(), CallError> {
    match update {
        CallUpdate::Accepted { call_id, pickup } => {
            adopt(state, &call_id);
            state.status = Some(CallStatus::Dispatched);
            if pickup.is_some() {
                state.counterpart_position = pickup;
            }
            state.error = None;
        }

        CallUpdate::Dispatched {
            call_id,
            ambulance,
            route,
        } => {
            adopt(state, &call_id);
            if state.status != Some(CallStatus::EnRoute) {
                state.status = Some(CallStatus::Dispatched);
            }
            if ambulance.is_some() {
                state.counterpart_position = ambulance;
            }
            if route.is_some() {
                state.active_route = route;
            }
        }

        CallUpdate::Position {
            call_id,
            position,
            route,
        } => {
            adopt(state, &call_id);
            state.counterpart_position = Some(position);
            if route.is_some() {
                replace_leg_route(state, route);
            }
        }

        CallUpdate::Route { call_id, route } => {
            adopt(state, &call_id);
            replace_leg_route(state, route);
        }

        CallUpdate::Status { call_id, status } => {
            adopt(state, &call_id);
            set_status(state, status);
        }

        CallUpdate::PatientIdentified {
            call_id,
            patient_id,
        } => {
            // Results for a call that has since been replaced are dropped.
            if !state.is_for(&call_id) {
                return Err(CallError::NotActiveCall { requested: call_id });
            }
            state.patient_id = Some(patient_id);
        }

        CallUpdate::HospitalSelected {
            call_id,
            hospital,
            route,
        } => {
            ensure_active(state, &call_id)?;
            if state.status != Some(CallStatus::Arrived) {
                return Err(CallError::NotArrived {
                    current: describe(state.status),
                });
            }
            state.selected_hospital = Some(hospital);
            state.active_route = None;
            state.hospital_route = route;
            state.status = Some(CallStatus::NavigatingToHospital);
        }

        CallUpdate::Advance { call_id, status } => {
            ensure_active(state, &call_id)?;
            let from = state.status.unwrap_or(CallStatus::Pending);
            let allowed = matches!(
                status,
                CallStatus::Dispatched | CallStatus::EnRoute | CallStatus::Arrived
            ) && status.rank() > from.rank();
            if !allowed {
                return Err(CallError::InvalidTransition {
                    from: describe(state.status),
                    to: status,
                });
            }
            set_status(state, status);
        }

        CallUpdate::Complete { call_id } => {
            ensure_active(state, &call_id)?;
            if state.status != Some(CallStatus::NavigatingToHospital) {
                return Err(CallError::InvalidTransition {
                    from: describe(state.status),
                    to: CallStatus::Completed,
                });
            }
            *state = CallState::default();
        }

        CallUpdate::Reset => *state = CallState::default(),

        CallUpdate::Error(message) => state.error = Some(message),
    }

    Ok(())
}

/// Take over `call_id` if it is not the current call.
fn adopt(state: &mut CallState, call_id: &str) {
    if state.is_for(call_id) {
        return;
    }
    if let Some(previous) = &state.call_id {
        debug!(previous = %previous, call_id = %call_id, "Replacing active call");
    }
    *state = CallState {
        call_id: Some(call_id.to_string()),
        status: Some(CallStatus::Pending),
        ..CallState::default()
    };
}

fn ensure_active(state: &CallState, call_id: &str) -> Result<(), CallError> {
    match &state.call_id {
        None => Err(CallError::NoActiveCall),
        Some(current) if current != call_id => Err(CallError::NotActiveCall {
            requested: call_id.to_string(),
        }),
        Some(_) => Ok(()),
    }
}

fn set_status(state: &mut CallState, status: CallStatus) {
    match status {
        CallStatus::Completed | CallStatus::Cancelled => *state = CallState::default(),
        CallStatus::Arrived => {
            state.status = Some(status);
            state.counterpart_position = None;
            state.active_route = None;
        }
        _ => state.status = Some(status),
    }
}

fn replace_leg_route(state: &mut CallState, route: Option<Route>) {
    if state.status == Some(CallStatus::NavigatingToHospital) {
        state.hospital_route = route;
    } else {
        state.active_route = route;
    }
}
