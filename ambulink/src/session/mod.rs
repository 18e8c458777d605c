//! Session/token coordination.
//!
//! Supplies the current bearer credential to HTTP requests and channel
//! handshakes, and performs single-flight token refresh when a request is
//! rejected.
//!
//! # Architecture
//!
//! ```text
//! AuthenticatedClient ──401──► SessionCoordinator::refresh_after_unauthorized
//!                                   │  (tokio Mutex: one refresh in flight)
//!                                   ├── TokenRefresher (HTTP refresh endpoint)
//!                                   └── TokenStore (external credential storage)
//! ```

mod coordinator;
mod error;
mod tokens;

pub use coordinator::{SessionCoordinator, TokenRefresher};
pub use error::SessionError;
pub use tokens::{MemoryTokenStore, TokenPair, TokenStore};
