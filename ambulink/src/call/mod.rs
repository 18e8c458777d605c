//! Call lifecycle state machine.
//!
//! Both roles fold their inbound events and local actions into a single
//! [`CallState`](crate::model::CallState) through [`CallUpdate`]s:
//!
//! ```text
//! idle ─► pending/dispatched ─► en_route ─► arrived ─► navigating_to_hospital ─► idle
//!                                              │               ▲
//!                                              └─ select hospital
//! ```
//!
//! Server events are authoritative: an event for a different call replaces
//! the current one instead of being rejected. Local actions are validated
//! and fail with [`CallError`].

mod error;
mod machine;
mod transition;

pub use error::CallError;
pub use machine::CallStateMachine;
pub use transition::{apply, CallUpdate};
