//! Error types for driver actions.

use thiserror::Error;

use crate::api::ApiError;
use crate::call::CallError;
use crate::channel::ChannelError;

/// A driver action that was refused or failed. Nothing was transmitted
/// unless the variant says otherwise.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The channel is down; responses are never queued.
    #[error("Not connected to dispatch")]
    NotConnected,

    #[error("Current location unavailable")]
    NoPosition,

    #[error(transparent)]
    Call(#[from] CallError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Dispatch API error: {0}")]
    Api(#[from] ApiError),
}
