//! Rider role: observes dispatch, ambulance position and status changes.
//!
//! The rider never sends lifecycle commands or its own position; it only
//! folds `/users` events into call state.

pub mod events;
mod session;

pub use session::RiderSession;
