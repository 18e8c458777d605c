//! WebSocket transport over tokio-tungstenite.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use super::error::ChannelError;
use super::frame::Frame;
use super::transport::{Connection, Transport};

/// Connects channels as WebSocket sessions.
///
/// The credential travels as a bearer `Authorization` header on the
/// upgrade request, so the server authenticates before any frame flows.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn connect(
        &self,
        url: &str,
        credential: &str,
    ) -> Result<WebSocketConnection, ChannelError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| ChannelError::InvalidEndpoint(e.to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", credential))
            .map_err(|_| ChannelError::InvalidCredential)?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (stream, response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| ChannelError::ConnectFailed(e.to_string()))?;

        debug!(
            url = %url,
            status = response.status().as_u16(),
            "WebSocket handshake complete"
        );

        Ok(WebSocketConnection { stream })
    }
}

/// An open WebSocket channel.
pub struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection for WebSocketConnection {
    async fn send(&mut self, frame: Frame) -> Result<(), ChannelError> {
        let text = frame.encode()?;
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, ChannelError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(ChannelError::Transport(e.to_string()))),
            };

            match message {
                Message::Text(text) => return Some(Frame::decode(&text)),
                Message::Binary(bytes) => {
                    return Some(
                        std::str::from_utf8(&bytes)
                            .map_err(|e| ChannelError::Malformed(e.to_string()))
                            .and_then(Frame::decode),
                    )
                }
                Message::Close(reason) => {
                    debug!(?reason, "WebSocket closed by peer");
                    return None;
                }
                // Ping/pong are answered by tungstenite
                other => trace!(kind = ?other, "Ignoring control frame"),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "WebSocket close failed");
        }
    }
}
