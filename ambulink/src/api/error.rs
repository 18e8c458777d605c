//! Error types for HTTP collaborators.

use thiserror::Error;

use crate::session::SessionError;

/// Errors returned by HTTP collaborator calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the response not read.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The server answered with a non-success status.
    #[error("{path} returned HTTP {status}")]
    Status { status: u16, path: String },

    /// The response body did not have the expected shape.
    #[error("Failed to parse response: {0}")]
    Decode(String),

    /// Credentials could not be renewed; the session has been logged out.
    #[error("Session expired: {0}")]
    SessionExpired(#[from] SessionError),
}

impl ApiError {
    /// True if the error ended the session.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }
}
