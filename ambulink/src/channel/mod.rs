//! Persistent event channel, one per role.
//!
//! The [`ConnectionManager`] owns the lifecycle of a role's channel: it
//! authenticates at handshake time, reconnects with capped exponential
//! backoff, fails over to an alternate host once, and runs an independent
//! [`ConnectionWatchdog`] that discards stalled connect attempts.
//!
//! # Architecture
//!
//! ```text
//! ConnectionManager::connect(credential)
//!     │
//!     ├── worker task ── Transport::connect ──► Connection (send / recv Frames)
//!     │       │                                      │
//!     │       └── mpsc::Sender<ChannelEvent> ◄───────┘  (one inbound queue per role)
//!     │
//!     ├── watchdog task (LinkStatus checks)
//!     │
//!     └── ChannelHandle::emit(Frame) ──► outbound queue ──► worker
//! ```
//!
//! Inbound frames are delivered serially in arrival order on the role's
//! queue; the role session drains it and folds events into call state.
//!
//! The in-process `memory` transport is only compiled for tests and with the
//! `test-util` feature.

mod backoff;
mod endpoint;
mod error;
mod frame;
mod manager;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
mod role;
mod slot;
mod status;
mod transport;
mod watchdog;
mod websocket;

pub use backoff::Backoff;
pub use endpoint::HostSelector;
pub use error::ChannelError;
pub use frame::Frame;
pub use manager::{ChannelConfig, ChannelEvent, ChannelHandle, ConnectionManager};
pub use role::Role;
pub use slot::Slot;
pub use status::LinkStatus;
pub use transport::{Connection, CredentialSource, Transport};
pub use watchdog::{ConnectionWatchdog, WatchdogAction};
pub use websocket::{WebSocketConnection, WebSocketTransport};
