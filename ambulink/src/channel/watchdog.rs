//! Connection watchdog.
//!
//! Runs on its own interval, independent of the worker, so a connect
//! attempt that never resolves cannot wedge the channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::manager::ChannelEvent;
use super::role::Role;
use super::status::LinkStatus;

/// Default connect attempt timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default watchdog check interval (1 second).
pub const WATCHDOG_INTERVAL_MS: u64 = 1_000;

/// Outcome of one watchdog check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogAction {
    Healthy,
    /// A connect attempt exceeded the timeout and was aborted.
    AbortedAttempt(Duration),
    /// The reported flag was corrected to the transport's real state.
    Corrected(bool),
}

/// Periodic health check for one channel session.
pub struct ConnectionWatchdog {
    role: Role,
    status: Arc<LinkStatus>,
    events: mpsc::Sender<ChannelEvent>,
    connect_timeout: Duration,
    interval: Duration,
}

impl ConnectionWatchdog {
    pub fn new(role: Role, status: Arc<LinkStatus>, events: mpsc::Sender<ChannelEvent>) -> Self {
        Self {
            role,
            status,
            events,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            interval: Duration::from_millis(WATCHDOG_INTERVAL_MS),
        }
    }

    pub fn with_timing(mut self, connect_timeout: Duration, interval: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.interval = interval;
        self
    }

    /// Runs the watchdog until cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            if self.status.is_closed() {
                break;
            }

            self.check();
        }

        debug!(role = %self.role, "Connection watchdog stopped");
    }

    /// Checks the session once.
    pub fn check(&self) -> WatchdogAction {
        if let Some(elapsed) = self.status.abort_stalled_attempt(self.connect_timeout) {
            warn!(
                role = %self.role,
                elapsed_ms = elapsed.as_millis() as u64,
                timeout_ms = self.connect_timeout.as_millis() as u64,
                "Connect attempt stalled, forcing reconnect"
            );
            return WatchdogAction::AbortedAttempt(elapsed);
        }

        if let Some(actual) = self.status.drifted() {
            if self.status.report(actual) {
                warn!(
                    role = %self.role,
                    connected = actual,
                    "Connection flag out of sync with transport, correcting"
                );
                if let Err(e) = self.events.try_send(ChannelEvent::ConnectionChanged(actual)) {
                    warn!(role = %self.role, error = %e, "Could not deliver connection change");
                }
                return WatchdogAction::Corrected(actual);
            }
        }

        WatchdogAction::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watchdog() -> (ConnectionWatchdog, Arc<LinkStatus>, mpsc::Receiver<ChannelEvent>) {
        let status = Arc::new(LinkStatus::new());
        let (tx, rx) = mpsc::channel(8);
        (ConnectionWatchdog::new(Role::Driver, status.clone(), tx), status, rx)
    }

    #[test]
    fn test_watchdog_defaults() {
        let (watchdog, _, _) = watchdog();
        assert_eq!(watchdog.connect_timeout, Duration::from_secs(10));
        assert_eq!(watchdog.interval, Duration::from_secs(1));
    }

    #[test]
    fn test_corrects_drift() {
        let (watchdog, status, mut rx) = watchdog();
        assert_eq!(watchdog.check(), WatchdogAction::Healthy);

        status.set_transport(true);
        assert_eq!(watchdog.check(), WatchdogAction::Corrected(true));
        assert!(status.is_connected());
        assert!(matches!(rx.try_recv(), Ok(ChannelEvent::ConnectionChanged(true))));

        // Already reconciled.
        assert_eq!(watchdog.check(), WatchdogAction::Healthy);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborts_stalled_attempt() {
        let (watchdog, status, _rx) = watchdog();
        let attempt = CancellationToken::new();
        status.begin_attempt(attempt.clone());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(matches!(watchdog.check(), WatchdogAction::AbortedAttempt(_)));
        assert!(attempt.is_cancelled());
    }

    #[tokio::test]
    async fn test_watchdog_stops_on_cancellation() {
        let (watchdog, _, _) = watchdog();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_millis(100), watchdog.run(shutdown)).await;
        assert!(result.is_ok());
    }
}
