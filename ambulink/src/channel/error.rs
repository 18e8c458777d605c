//! Error types for the event channel.

use thiserror::Error;

/// Errors raised by the channel and its transports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The endpoint URL could not be turned into a handshake request.
    #[error("Invalid channel endpoint: {0}")]
    InvalidEndpoint(String),

    /// The credential cannot be carried in a handshake header.
    #[error("Credential is not a valid header value")]
    InvalidCredential,

    /// The handshake failed (host unreachable, rejected, TLS error).
    #[error("Channel connect failed: {0}")]
    ConnectFailed(String),

    /// An established connection failed.
    #[error("Channel transport error: {0}")]
    Transport(String),

    /// A frame or its payload could not be decoded. Dropped per event.
    #[error("Malformed channel frame: {0}")]
    Malformed(String),

    /// The channel is not connected; nothing was sent.
    #[error("Channel not connected")]
    NotConnected,

    /// The outbound queue is full; the frame was dropped.
    #[error("Outbound queue full")]
    QueueFull,
}
