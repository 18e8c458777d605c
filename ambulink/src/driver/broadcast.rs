//! Periodic position broadcast while a call is active.

use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::events::{LocationUpdate, LOCATION_UPDATE};
use crate::channel::{ChannelError, ChannelHandle};
use crate::model::{CallState, LatLng};

/// Default broadcast period (2 seconds).
pub const DEFAULT_BROADCAST_INTERVAL: Duration = Duration::from_secs(2);

/// Where position updates go.
pub trait LocationSink: Send + Sync + 'static {
    fn send_location(&self, update: &LocationUpdate) -> Result<(), ChannelError>;
}

impl LocationSink for ChannelHandle {
    fn send_location(&self, update: &LocationUpdate) -> Result<(), ChannelError> {
        self.emit_event(LOCATION_UPDATE, update)
    }
}

/// Result of one broadcast tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastOutcome {
    Sent,
    NoCall,
    NoPosition,
    /// The sink refused; the position is dropped, not buffered.
    Dropped(ChannelError),
}

/// Emits `location.update` every tick while a call is active and a fix is
/// known.
///
/// Reads the latest call and position at each tick and never blocks on
/// event delivery. Missed ticks are skipped.
pub struct LocationBroadcastLoop<S: LocationSink> {
    sink: S,
    calls: watch::Receiver<CallState>,
    positions: watch::Receiver<Option<LatLng>>,
    interval: Duration,
}

impl<S: LocationSink> LocationBroadcastLoop<S> {
    pub fn new(
        sink: S,
        calls: watch::Receiver<CallState>,
        positions: watch::Receiver<Option<LatLng>>,
    ) -> Self {
        Self {
            sink,
            calls,
            positions,
            interval: DEFAULT_BROADCAST_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs the loop until cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            if shutdown.is_cancelled() {
                break;
            }

            self.tick();
        }

        debug!("Location broadcast stopped");
    }

    /// Emit once if a call is active and a position is known.
    pub fn tick(&self) -> BroadcastOutcome {
        let call_id = match self.calls.borrow().call_id.clone() {
            Some(call_id) => call_id,
            None => return BroadcastOutcome::NoCall,
        };
        let Some(position) = *self.positions.borrow() else {
            return BroadcastOutcome::NoPosition;
        };

        let update = LocationUpdate {
            call_id,
            latitude: position.latitude,
            longitude: position.longitude,
        };
        match self.sink.send_location(&update) {
            Ok(()) => {
                trace!(call_id = %update.call_id, position = %position, "Location broadcast");
                BroadcastOutcome::Sent
            }
            Err(e) => {
                debug!(call_id = %update.call_id, error = %e, "Location update dropped");
                BroadcastOutcome::Dropped(e)
            }
        }
    }
}
