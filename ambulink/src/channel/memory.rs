//! In-process transport.
//!
//! [`MemoryTransport`] hands each accepted connection to a [`MemoryServer`]
//! as a [`MemoryPeer`], which can push frames to the client and read what
//! the client sent. Connect outcomes can be scripted to simulate refused or
//! hanging handshakes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;

use super::error::ChannelError;
use super::frame::Frame;
use super::transport::{Connection, Transport};

/// Scripted result of a connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Accept,
    Refuse,
    /// The handshake never completes.
    Hang,
}

/// A connect attempt as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectAttempt {
    pub url: String,
    pub credential: String,
}

#[derive(Debug, Default)]
struct Shared {
    script: VecDeque<ConnectOutcome>,
    attempts: Vec<ConnectAttempt>,
}

/// Client side of the in-process transport.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    shared: Arc<Mutex<Shared>>,
    accepted: mpsc::UnboundedSender<MemoryPeer>,
}

/// Server side: receives accepted connections.
#[derive(Debug)]
pub struct MemoryServer {
    shared: Arc<Mutex<Shared>>,
    accepted: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryTransport {
    pub fn new() -> (Self, MemoryServer) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                shared: shared.clone(),
                accepted: tx,
            },
            MemoryServer {
                shared,
                accepted: rx,
            },
        )
    }
}

impl Transport for MemoryTransport {
    type Connection = MemoryConnection;

    async fn connect(&self, url: &str, credential: &str) -> Result<MemoryConnection, ChannelError> {
        let outcome = {
            let mut shared = self.shared.lock().unwrap();
            shared.attempts.push(ConnectAttempt {
                url: url.to_string(),
                credential: credential.to_string(),
            });
            shared.script.pop_front().unwrap_or(ConnectOutcome::Accept)
        };

        match outcome {
            ConnectOutcome::Accept => {}
            ConnectOutcome::Refuse => {
                return Err(ChannelError::ConnectFailed(format!("{} refused", url)))
            }
            ConnectOutcome::Hang => std::future::pending::<()>().await,
        }

        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();
        let peer = MemoryPeer {
            attempt: ConnectAttempt {
                url: url.to_string(),
                credential: credential.to_string(),
            },
            outbound: to_client,
            inbound: from_client,
        };
        self.accepted
            .send(peer)
            .map_err(|_| ChannelError::ConnectFailed("server gone".to_string()))?;

        Ok(MemoryConnection {
            inbound: from_server,
            outbound: to_server,
        })
    }
}

impl MemoryServer {
    /// Queue outcomes for the next connect attempts. Unscripted attempts
    /// are accepted.
    pub fn script(&self, outcomes: impl IntoIterator<Item = ConnectOutcome>) {
        self.shared.lock().unwrap().script.extend(outcomes);
    }

    /// Every connect attempt so far, in order.
    pub fn attempts(&self) -> Vec<ConnectAttempt> {
        self.shared.lock().unwrap().attempts.clone()
    }

    /// Wait for the next accepted connection.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accepted.recv().await
    }

    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.accepted.try_recv().ok()
    }
}

/// Server end of one accepted connection. Dropping it closes the channel.
#[derive(Debug)]
pub struct MemoryPeer {
    pub attempt: ConnectAttempt,
    outbound: mpsc::UnboundedSender<Result<Frame, ChannelError>>,
    inbound: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryPeer {
    /// Push an event to the client. Returns false if the client is gone.
    pub fn emit(&self, event: &str, data: Value) -> bool {
        self.outbound.send(Ok(Frame::new(event, data))).is_ok()
    }

    /// Push raw text, decoded the way a real transport would.
    pub fn send_raw(&self, text: &str) -> bool {
        self.outbound.send(Frame::decode(text)).is_ok()
    }

    /// Next frame the client sent.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.inbound.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Frame> {
        self.inbound.try_recv().ok()
    }
}

/// Client end of an in-process connection.
#[derive(Debug)]
pub struct MemoryConnection {
    inbound: mpsc::UnboundedReceiver<Result<Frame, ChannelError>>,
    outbound: mpsc::UnboundedSender<Frame>,
}

impl Connection for MemoryConnection {
    async fn send(&mut self, frame: Frame) -> Result<(), ChannelError> {
        self.outbound
            .send(frame)
            .map_err(|_| ChannelError::Transport("peer closed".to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, ChannelError>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.inbound.close();
    }
}
