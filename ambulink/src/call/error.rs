//! Error types for call transitions.

use thiserror::Error;

use crate::model::CallStatus;

/// A local action that does not fit the current call state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("No active call")]
    NoActiveCall,

    /// The action names a call other than the current one.
    #[error("Call {requested} is not the active call")]
    NotActiveCall { requested: String },

    #[error("Cannot move call from {from} to {to}")]
    InvalidTransition { from: String, to: CallStatus },

    #[error("A hospital can only be selected after arrival (status: {current})")]
    NotArrived { current: String },
}

pub(crate) fn describe(status: Option<CallStatus>) -> String {
    status.map_or_else(|| "idle".to_string(), |s| s.to_string())
}
