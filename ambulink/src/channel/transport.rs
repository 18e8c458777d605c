//! Transport seam for the event channel.
//!
//! The manager only needs to open an authenticated connection and move
//! frames; the WebSocket implementation and the in-memory one used in
//! tests both sit behind these traits.

use std::future::Future;

use super::error::ChannelError;
use super::frame::Frame;

/// Opens authenticated channel connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;

    /// Connect to `url`, presenting `credential` at handshake time.
    fn connect(
        &self,
        url: &str,
        credential: &str,
    ) -> impl Future<Output = Result<Self::Connection, ChannelError>> + Send;
}

/// An established channel connection.
pub trait Connection: Send + 'static {
    fn send(&mut self, frame: Frame) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Next inbound frame.
    ///
    /// `None` means the peer closed the connection. A `Malformed` error
    /// affects only that frame; any other error ends the connection.
    fn recv(&mut self) -> impl Future<Output = Option<Result<Frame, ChannelError>>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Supplies the bearer credential for each connect attempt.
///
/// Read again before every reconnect so a rotated access token is what the
/// handshake presents.
pub trait CredentialSource: Send + Sync + 'static {
    /// Current credential, or `None` when there is none to present.
    fn current_credential(&self) -> Option<String>;
}
