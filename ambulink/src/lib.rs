//! Ambulink - real-time coordination layer for emergency dispatch.
//!
//! Matches ambulance drivers to incoming calls and keeps the caller (rider)
//! and driver synchronized on one call's lifecycle over a persistent,
//! authenticated event channel per role.
//!
//! # High-Level API
//!
//! A [`context::SessionContext`] is opened at login and owns one session
//! per role:
//!
//! ```ignore
//! use ambulink::config::ConfigFile;
//! use ambulink::context::HttpSessionContext;
//! use ambulink::session::{MemoryTokenStore, TokenPair};
//!
//! let config = ConfigFile::load()?;
//! let store = Arc::new(MemoryTokenStore::with_tokens(TokenPair::new(access, refresh)));
//! let mut context = HttpSessionContext::from_config(&config, store)?;
//!
//! let driver = context.connect_driver()?;
//! while let Some(event) = driver.next_event().await {
//!     driver.handle_event(event);
//! }
//! ```

pub mod api;
pub mod call;
pub mod channel;
pub mod config;
pub mod context;
pub mod driver;
pub mod logging;
pub mod model;
pub mod polyline;
pub mod rider;
pub mod session;

/// Version of the Ambulink library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
