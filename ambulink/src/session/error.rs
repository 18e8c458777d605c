//! Error types for session coordination.

use thiserror::Error;

/// Errors that end a refresh attempt.
///
/// Every variant implies the stored credentials have been wiped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No access token is stored.
    #[error("Not logged in")]
    NotAuthenticated,

    /// No refresh token is stored.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The refresh endpoint rejected the refresh token.
    #[error("Refresh token rejected (HTTP {status})")]
    RefreshRejected { status: u16 },

    /// The refresh request could not be completed.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
}
