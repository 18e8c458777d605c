//! Per-role connection lifecycle.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backoff::{Backoff, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF};
use super::endpoint::HostSelector;
use super::error::ChannelError;
use super::frame::Frame;
use super::role::Role;
use super::status::LinkStatus;
use super::transport::{Connection, CredentialSource, Transport};
use super::watchdog::{ConnectionWatchdog, CONNECT_TIMEOUT_SECS, WATCHDOG_INTERVAL_MS};

/// Default inbound event queue depth.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Default outbound frame queue depth.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 32;

/// Timing and queue sizing for a channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub connect_timeout: Duration,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    pub watchdog_interval: Duration,
    pub event_buffer: usize,
    pub outbound_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            backoff_initial: DEFAULT_INITIAL_BACKOFF,
            backoff_max: DEFAULT_MAX_BACKOFF,
            watchdog_interval: Duration::from_millis(WATCHDOG_INTERVAL_MS),
            event_buffer: DEFAULT_EVENT_BUFFER,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

/// Something that happened on a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    ConnectionChanged(bool),
    Message(Frame),
}

#[derive(Debug, Clone)]
struct Link {
    outbound: mpsc::Sender<Frame>,
    status: Arc<LinkStatus>,
}

type SharedLink = Arc<RwLock<Option<Link>>>;

/// Cheap handle for emitting on a role's channel.
///
/// Follows the manager across reconnects: it always targets the current
/// session and refuses while disconnected.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    role: Role,
    link: SharedLink,
}

impl ChannelHandle {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_connected(&self) -> bool {
        self.link
            .read()
            .unwrap()
            .as_ref()
            .is_some_and(|link| link.status.is_connected())
    }

    /// Queue a frame for sending.
    ///
    /// Fails with `NotConnected` instead of queueing while the channel is
    /// down, so nothing emitted during an outage is sent later.
    pub fn emit(&self, frame: Frame) -> Result<(), ChannelError> {
        let guard = self.link.read().unwrap();
        let link = guard.as_ref().ok_or(ChannelError::NotConnected)?;
        if !link.status.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        link.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => ChannelError::QueueFull,
            TrySendError::Closed(_) => ChannelError::NotConnected,
        })
    }

    pub fn emit_event<T: Serialize>(&self, event: &str, payload: &T) -> Result<(), ChannelError> {
        self.emit(Frame::from_payload(event, payload)?)
    }
}

struct ActiveSession {
    credential: String,
    shutdown: CancellationToken,
    status: Arc<LinkStatus>,
    events_tx: mpsc::Sender<ChannelEvent>,
    events: mpsc::Receiver<ChannelEvent>,
}

/// Owns one role's channel session.
pub struct ConnectionManager<T: Transport> {
    role: Role,
    transport: Arc<T>,
    hosts: Arc<HostSelector>,
    config: ChannelConfig,
    link: SharedLink,
    credentials: Option<Arc<dyn CredentialSource>>,
    session: Option<ActiveSession>,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(role: Role, transport: Arc<T>, hosts: Arc<HostSelector>, config: ChannelConfig) -> Self {
        Self {
            role,
            transport,
            hosts,
            config,
            link: Arc::new(RwLock::new(None)),
            credentials: None,
            session: None,
        }
    }

    /// Read the credential from `source` on every reconnect.
    ///
    /// The credential passed to [`connect`](Self::connect) is used until the
    /// source yields one.
    pub fn with_credentials(mut self, source: Arc<dyn CredentialSource>) -> Self {
        self.credentials = Some(source);
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn hosts(&self) -> &Arc<HostSelector> {
        &self.hosts
    }

    pub fn handle(&self) -> ChannelHandle {
        ChannelHandle {
            role: self.role,
            link: self.link.clone(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.status.is_connected())
    }

    /// Open the channel with `credential`.
    ///
    /// Idempotent while connected with the same credential: the connection
    /// change is re-announced and nothing else happens. Otherwise any stale
    /// session is torn down and a fresh one started. Must be called from
    /// within a tokio runtime.
    pub fn connect(&mut self, credential: &str) {
        if let Some(session) = &self.session {
            if session.credential == credential && session.status.is_connected() {
                debug!(role = %self.role, "Channel already connected");
                if let Err(e) = session
                    .events_tx
                    .try_send(ChannelEvent::ConnectionChanged(true))
                {
                    warn!(role = %self.role, error = %e, "Could not deliver connection change");
                }
                return;
            }
        }

        self.teardown();

        let status = Arc::new(LinkStatus::new());
        let shutdown = CancellationToken::new();
        let (events_tx, events) = mpsc::channel(self.config.event_buffer.max(1));
        let (outbound_tx, outbound) = mpsc::channel(self.config.outbound_buffer.max(1));

        *self.link.write().unwrap() = Some(Link {
            outbound: outbound_tx,
            status: status.clone(),
        });

        let worker = ChannelWorker {
            role: self.role,
            transport: self.transport.clone(),
            hosts: self.hosts.clone(),
            credential: credential.to_string(),
            credentials: self.credentials.clone(),
            config: self.config.clone(),
            status: status.clone(),
            events: events_tx.clone(),
            outbound,
        };
        tokio::spawn(worker.run(shutdown.clone()));

        let watchdog = ConnectionWatchdog::new(self.role, status.clone(), events_tx.clone())
            .with_timing(self.config.connect_timeout, self.config.watchdog_interval);
        tokio::spawn(watchdog.run(shutdown.clone()));

        info!(
            role = %self.role,
            endpoint = %self.hosts.endpoint_url(self.role.namespace()),
            "Channel connecting"
        );

        self.session = Some(ActiveSession {
            credential: credential.to_string(),
            shutdown,
            status,
            events_tx,
            events,
        });
    }

    /// Close the channel.
    ///
    /// The watchdog and worker are cancelled and the session is marked down
    /// before this returns; pending inbound events are discarded.
    pub fn disconnect(&mut self) {
        if self.teardown() {
            info!(role = %self.role, "Channel disconnected");
        }
    }

    /// Next event from the current session, in arrival order.
    ///
    /// Returns `None` when no session is active.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        match self.session.as_mut() {
            Some(session) => session.events.recv().await,
            None => None,
        }
    }

    fn teardown(&mut self) -> bool {
        self.link.write().unwrap().take();
        match self.session.take() {
            Some(session) => {
                session.status.close();
                session.shutdown.cancel();
                true
            }
            None => false,
        }
    }
}

impl<T: Transport> Drop for ConnectionManager<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ended {
    Shutdown,
    Lost,
}

/// Drives one session: connect, pump frames, reconnect.
struct ChannelWorker<T: Transport> {
    role: Role,
    transport: Arc<T>,
    hosts: Arc<HostSelector>,
    credential: String,
    credentials: Option<Arc<dyn CredentialSource>>,
    config: ChannelConfig,
    status: Arc<LinkStatus>,
    events: mpsc::Sender<ChannelEvent>,
    outbound: mpsc::Receiver<Frame>,
}

impl<T: Transport> ChannelWorker<T> {
    async fn run(mut self, shutdown: CancellationToken) {
        let mut backoff = Backoff::new(self.config.backoff_initial, self.config.backoff_max);

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let url = self.hosts.endpoint_url(self.role.namespace());
            self.refresh_credential();
            let attempt = shutdown.child_token();
            self.status.begin_attempt(attempt.clone());
            debug!(role = %self.role, url = %url, "Connect attempt");

            let result = tokio::select! {
                _ = attempt.cancelled() => None,
                result = self.transport.connect(&url, &self.credential) => Some(result),
            };
            self.status.end_attempt();

            match result {
                None if shutdown.is_cancelled() => break,
                None => {
                    warn!(role = %self.role, url = %url, "Channel connect stalled");
                    self.set_link(false).await;
                    if self.fail_over() {
                        continue;
                    }
                }
                Some(Ok(conn)) => {
                    backoff.reset();
                    self.discard_queued();
                    self.set_link(true).await;
                    info!(role = %self.role, url = %url, "Channel connected");

                    let ended = self.pump(conn, &shutdown).await;
                    if ended == Ended::Shutdown {
                        break;
                    }
                    self.set_link(false).await;
                    warn!(role = %self.role, "Channel lost");
                }
                Some(Err(e)) => {
                    warn!(role = %self.role, url = %url, error = %e, "Channel connect failed");
                    self.set_link(false).await;
                    if self.fail_over() {
                        continue;
                    }
                }
            }

            let delay = backoff.next_delay();
            debug!(
                role = %self.role,
                delay_ms = delay.as_millis() as u64,
                attempt = backoff.attempts(),
                "Reconnecting after backoff"
            );
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!(role = %self.role, "Channel worker stopped");
    }

    /// Switch to the fallback host if that has not happened yet.
    fn fail_over(&self) -> bool {
        if !self.hosts.fail_over() {
            return false;
        }
        warn!(
            role = %self.role,
            host = %self.hosts.current(),
            "Switching to fallback host"
        );
        true
    }

    fn refresh_credential(&mut self) {
        if let Some(current) = self.credentials.as_ref().and_then(|s| s.current_credential()) {
            if current != self.credential {
                debug!(role = %self.role, "Using rotated credential");
                self.credential = current;
            }
        }
    }

    /// Move frames until the connection ends.
    async fn pump(&mut self, mut conn: T::Connection, shutdown: &CancellationToken) -> Ended {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    conn.close().await;
                    return Ended::Shutdown;
                }

                outbound = self.outbound.recv() => {
                    let Some(frame) = outbound else {
                        conn.close().await;
                        return Ended::Shutdown;
                    };
                    let event = frame.event.clone();
                    if let Err(e) = conn.send(frame).await {
                        warn!(role = %self.role, event = %event, error = %e, "Send failed");
                        return Ended::Lost;
                    }
                }

                inbound = conn.recv() => match inbound {
                    None => return Ended::Lost,
                    Some(Ok(frame)) => {
                        if self.events.send(ChannelEvent::Message(frame)).await.is_err() {
                            conn.close().await;
                            return Ended::Shutdown;
                        }
                    }
                    Some(Err(ChannelError::Malformed(reason))) => {
                        warn!(role = %self.role, reason = %reason, "Dropping malformed frame");
                    }
                    Some(Err(e)) => {
                        warn!(role = %self.role, error = %e, "Channel transport error");
                        return Ended::Lost;
                    }
                },
            }
        }
    }

    /// Drop frames queued for a connection that no longer exists.
    fn discard_queued(&mut self) {
        let mut dropped = 0usize;
        while self.outbound.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(role = %self.role, dropped, "Discarded frames queued before reconnect");
        }
    }

    /// Record the transport state and announce it if it changed.
    async fn set_link(&self, up: bool) {
        self.status.set_transport(up);
        if !self.status.report(up) || self.status.is_closed() {
            return;
        }
        let _ = self.events.send(ChannelEvent::ConnectionChanged(up)).await;
    }
}
