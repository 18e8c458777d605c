//! Driver role: call offers, call lifecycle commands and position broadcast.
//!
//! - [`events`] - wire payloads of the `/drivers` namespace
//! - [`OfferSlot`] - the single pending offer
//! - [`LocationBroadcastLoop`] - periodic `location.update` while serving a call
//! - [`DriverSession`] - ties the channel, state machine and HTTP collaborators together

mod broadcast;
mod error;
pub mod events;
mod offer;
mod session;

pub use broadcast::{BroadcastOutcome, LocationBroadcastLoop, LocationSink, DEFAULT_BROADCAST_INTERVAL};
pub use error::DispatchError;
pub use offer::OfferSlot;
pub use session::{DriverConfig, DriverSession};
