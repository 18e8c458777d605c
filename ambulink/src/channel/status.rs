//! Shared link state between the channel worker, watchdog and handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Connection state of one channel session.
///
/// Two flags are tracked: whether the transport is actually up, and what
/// subscribers were last told. The watchdog reconciles them when they drift.
#[derive(Debug, Default)]
pub struct LinkStatus {
    transport_up: AtomicBool,
    reported_up: AtomicBool,
    closed: AtomicBool,
    attempt: Mutex<Option<Attempt>>,
}

#[derive(Debug)]
struct Attempt {
    started: Instant,
    abort: CancellationToken,
}

impl LinkStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the channel is connected, as last reported to subscribers.
    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.reported_up.load(Ordering::SeqCst)
    }

    /// Whether the underlying transport is up.
    pub fn transport_connected(&self) -> bool {
        self.transport_up.load(Ordering::SeqCst)
    }

    pub(crate) fn set_transport(&self, up: bool) {
        self.transport_up.store(up, Ordering::SeqCst);
    }

    /// Record what subscribers were told. Returns true if the value changed.
    pub(crate) fn report(&self, up: bool) -> bool {
        self.reported_up.swap(up, Ordering::SeqCst) != up
    }

    /// Whether the reported flag disagrees with the transport.
    pub(crate) fn drifted(&self) -> Option<bool> {
        let transport = self.transport_connected();
        (transport != self.reported_up.load(Ordering::SeqCst)).then_some(transport)
    }

    /// Permanently mark this session down. Used on explicit disconnect.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.transport_up.store(false, Ordering::SeqCst);
        self.reported_up.store(false, Ordering::SeqCst);
        self.end_attempt();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn begin_attempt(&self, abort: CancellationToken) {
        *self.attempt.lock().unwrap() = Some(Attempt {
            started: Instant::now(),
            abort,
        });
    }

    pub(crate) fn end_attempt(&self) {
        self.attempt.lock().unwrap().take();
    }

    /// How long the in-flight connect attempt has been running.
    pub fn attempt_elapsed(&self) -> Option<Duration> {
        self.attempt
            .lock()
            .unwrap()
            .as_ref()
            .map(|a| a.started.elapsed())
    }

    /// Abort the in-flight attempt if it has run longer than `timeout`.
    ///
    /// Returns the elapsed time of the aborted attempt.
    pub(crate) fn abort_stalled_attempt(&self, timeout: Duration) -> Option<Duration> {
        let mut attempt = self.attempt.lock().unwrap();
        let elapsed = attempt.as_ref()?.started.elapsed();
        if elapsed < timeout {
            return None;
        }
        if let Some(stalled) = attempt.take() {
            stalled.abort.cancel();
        }
        Some(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_detects_change() {
        let status = LinkStatus::new();
        assert!(!status.is_connected());
        assert!(status.report(true));
        assert!(!status.report(true));
        assert!(status.is_connected());
    }

    #[test]
    fn test_drift() {
        let status = LinkStatus::new();
        assert_eq!(status.drifted(), None);

        status.set_transport(true);
        assert_eq!(status.drifted(), Some(true));

        status.report(true);
        assert_eq!(status.drifted(), None);
    }

    #[test]
    fn test_close_is_sticky() {
        let status = LinkStatus::new();
        status.set_transport(true);
        status.report(true);

        status.close();
        status.report(true);
        assert!(!status.is_connected());
        assert!(status.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_stalled_attempt() {
        let status = LinkStatus::new();
        let token = CancellationToken::new();
        status.begin_attempt(token.clone());

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(status.abort_stalled_attempt(Duration::from_secs(10)).is_none());
        assert!(!token.is_cancelled());

        tokio::time::advance(Duration::from_secs(8)).await;
        let elapsed = status.abort_stalled_attempt(Duration::from_secs(10)).unwrap();
        assert!(elapsed >= Duration::from_secs(10));
        assert!(token.is_cancelled());
        assert!(status.attempt_elapsed().is_none());
    }
}
