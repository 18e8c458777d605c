//! Published call state.

use tokio::sync::watch;
use tracing::debug;

use super::error::CallError;
use super::transition::{apply, CallUpdate};
use crate::model::CallState;

/// Owns the authoritative [`CallState`] and publishes every change.
///
/// Each update is computed on a copy and swapped in whole, so readers never
/// see a half-applied transition.
#[derive(Debug)]
pub struct CallStateMachine {
    state: watch::Sender<CallState>,
}

impl CallStateMachine {
    pub fn new() -> Self {
        let (state, _) = watch::channel(CallState::default());
        Self { state }
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> CallState {
        self.state.borrow().clone()
    }

    /// Apply an update. Returns whether the state changed.
    pub fn apply(&self, update: CallUpdate) -> Result<bool, CallError> {
        let mut next = self.snapshot();
        apply(&mut next, update)?;

        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });

        if changed {
            let state = self.state.borrow();
            debug!(
                call_id = state.call_id.as_deref().unwrap_or("-"),
                status = %super::error::describe(state.status),
                "Call state updated"
            );
        }
        Ok(changed)
    }

    pub fn reset(&self) {
        self.state.send_if_modified(|current| {
            if *current == CallState::default() {
                return false;
            }
            *current = CallState::default();
            true
        });
    }
}

impl Default for CallStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
