//! Base host selection with one-shot failover.

use std::sync::atomic::{AtomicBool, Ordering};

/// Primary host plus an optional fallback.
///
/// After the first connect error on the primary, [`fail_over`](Self::fail_over)
/// switches to the fallback once. There is no automatic switch back.
#[derive(Debug)]
pub struct HostSelector {
    primary: String,
    fallback: Option<String>,
    failed_over: AtomicBool,
}

impl HostSelector {
    pub fn new(primary: impl Into<String>, fallback: Option<String>) -> Self {
        Self {
            primary: trim_host(primary.into()),
            fallback: fallback.map(trim_host).filter(|f| !f.is_empty()),
            failed_over: AtomicBool::new(false),
        }
    }

    /// Base URL currently in use.
    pub fn current(&self) -> &str {
        match (&self.fallback, self.failed_over.load(Ordering::SeqCst)) {
            (Some(fallback), true) => fallback,
            _ => &self.primary,
        }
    }

    pub fn is_primary(&self) -> bool {
        !self.failed_over.load(Ordering::SeqCst)
    }

    /// Switch to the fallback host.
    ///
    /// Returns true only for the call that performed the switch; false if
    /// already switched or no fallback is configured.
    pub fn fail_over(&self) -> bool {
        if self.fallback.is_none() {
            return false;
        }
        self.failed_over
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// WebSocket URL for a channel namespace on the current host.
    pub fn endpoint_url(&self, namespace: &str) -> String {
        let base = self.current();
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}{}", base, namespace)
    }
}

fn trim_host(host: String) -> String {
    host.trim().trim_end_matches('/').to_string()
}
