//! Rider session.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::events::RiderEvent;
use crate::call::{CallStateMachine, CallUpdate};
use crate::channel::{ChannelEvent, ConnectionManager, Slot, Transport};
use crate::model::{CallState, CallStatus, LatLng, Route};

/// The rider side of the real-time layer.
pub struct RiderSession<T: Transport> {
    manager: ConnectionManager<T>,
    machine: CallStateMachine,
    ambulance_id: Option<String>,
    on_connection: Slot<bool>,
    on_dispatched: Slot<CallState>,
    on_ambulance_location: Slot<LatLng>,
    on_status: Slot<CallStatus>,
}

impl<T: Transport> RiderSession<T> {
    pub fn new(manager: ConnectionManager<T>) -> Self {
        Self {
            manager,
            machine: CallStateMachine::new(),
            ambulance_id: None,
            on_connection: Slot::new(),
            on_dispatched: Slot::new(),
            on_ambulance_location: Slot::new(),
            on_status: Slot::new(),
        }
    }

    pub fn connect(&mut self, credential: &str) {
        self.manager.connect(credential);
    }

    /// Close the channel, clear callbacks and forget the call.
    pub fn disconnect(&mut self) {
        self.manager.disconnect();
        self.machine.reset();
        self.ambulance_id = None;
        self.on_connection.clear();
        self.on_dispatched.clear();
        self.on_ambulance_location.clear();
        self.on_status.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.manager.next_event().await
    }

    pub fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::ConnectionChanged(connected) => {
                debug!(connected, "Rider channel connection changed");
                self.on_connection.fire(&connected);
            }
            ChannelEvent::Message(frame) => match RiderEvent::from_frame(&frame) {
                Ok(Some(event)) => self.apply_event(event),
                Ok(None) => debug!(event = %frame.event, "Ignoring unhandled rider event"),
                Err(e) => warn!(event = %frame.event, error = %e, "Dropping malformed rider event"),
            },
        }
    }

    pub fn state(&self) -> CallState {
        self.machine.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        self.machine.subscribe()
    }

    /// Ambulance assigned to the current call, if the server named one.
    pub fn ambulance_id(&self) -> Option<&str> {
        self.ambulance_id.as_deref()
    }

    pub fn on_connection_changed<F>(&mut self, handler: F)
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.on_connection.set(handler);
    }

    pub fn on_dispatched<F>(&mut self, handler: F)
    where
        F: Fn(&CallState) + Send + Sync + 'static,
    {
        self.on_dispatched.set(handler);
    }

    pub fn on_ambulance_location<F>(&mut self, handler: F)
    where
        F: Fn(&LatLng) + Send + Sync + 'static,
    {
        self.on_ambulance_location.set(handler);
    }

    pub fn on_status<F>(&mut self, handler: F)
    where
        F: Fn(&CallStatus) + Send + Sync + 'static,
    {
        self.on_status.set(handler);
    }

    fn apply_event(&mut self, event: RiderEvent) {
        match event {
            RiderEvent::Dispatched(event) => {
                info!(
                    call_id = %event.call_id,
                    ambulance_id = %event.ambulance_id,
                    "Ambulance dispatched"
                );
                self.ambulance_id = (!event.ambulance_id.is_empty()).then_some(event.ambulance_id);
                self.update(CallUpdate::Dispatched {
                    call_id: event.call_id,
                    ambulance: event.ambulance_location,
                    route: event.route.as_ref().and_then(Route::from_payload),
                });
                self.on_dispatched.fire(&self.machine.snapshot());
            }
            RiderEvent::AmbulanceLocation(event) => {
                let position = event.ambulance_location;
                self.update(CallUpdate::Position {
                    call_id: event.call_id,
                    position,
                    route: event.route.as_ref().and_then(Route::from_payload),
                });
                self.on_ambulance_location.fire(&position);
            }
            RiderEvent::Status(event) => {
                let status = match CallStatus::parse(&event.status) {
                    Ok(status) => status,
                    Err(e) => {
                        warn!(call_id = %event.call_id, error = %e, "Dropping status change");
                        return;
                    }
                };
                info!(call_id = %event.call_id, status = %status, "Call status changed");
                self.update(CallUpdate::Status {
                    call_id: event.call_id,
                    status,
                });
                if status.is_terminal() {
                    self.ambulance_id = None;
                }
                self.on_status.fire(&status);
            }
        }
    }

    fn update(&self, update: CallUpdate) {
        if let Err(e) = self.machine.apply(update) {
            warn!(error = %e, "Rider update rejected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::memory::{MemoryPeer, MemoryTransport};
    use crate::channel::{ChannelConfig, HostSelector, Role};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn connected() -> (RiderSession<MemoryTransport>, MemoryPeer) {
        let (transport, mut server) = MemoryTransport::new();
        let manager = ConnectionManager::new(
            Role::Rider,
            Arc::new(transport),
            Arc::new(HostSelector::new("http://dispatch.test", None)),
            ChannelConfig::default(),
        );
        let mut session = RiderSession::new(manager);
        session.connect("tok");
        let event = session.next_event().await.unwrap();
        session.handle_event(event);
        let peer = server.accept().await.unwrap();
        assert_eq!(peer.attempt.url, "ws://dispatch.test/users");
        (session, peer)
    }

    async fn deliver(session: &mut RiderSession<MemoryTransport>) {
        let event = session.next_event().await.unwrap();
        session.handle_event(event);
    }

    fn dispatched(call_id: &str) -> serde_json::Value {
        json!({
            "callId": call_id,
            "ambulanceId": "amb-3",
            "ambulanceLocation": {"latitude": 6.52, "longitude": 3.37},
            "route": {"polyline": "_p~iF~ps|U_ulLnnqC_mqNvxq`@", "distance": 2100, "duration": 300}
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatched_sets_assigned_phase() {
        let (mut session, peer) = connected().await;
        peer.emit("call.dispatched", dispatched("c2"));
        deliver(&mut session).await;

        let state = session.state();
        assert!(state.is_for("c2"));
        assert_eq!(state.status, Some(CallStatus::Dispatched));
        assert_eq!(state.counterpart_position, Some(LatLng::new(6.52, 3.37)));
        assert_eq!(state.active_route.as_ref().unwrap().point_count(), 3);
        assert_eq!(session.ambulance_id(), Some("amb-3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_update_keeps_status() {
        let (mut session, peer) = connected().await;
        peer.emit("call.dispatched", dispatched("c2"));
        peer.emit("call.status", json!({"callId": "c2", "status": "EN_ROUTE"}));
        peer.emit(
            "ambulance.location",
            json!({"callId": "c2", "ambulanceLocation": {"latitude": 6.53, "longitude": 3.38}}),
        );
        for _ in 0..3 {
            deliver(&mut session).await;
        }

        let state = session.state();
        assert_eq!(state.status, Some(CallStatus::EnRoute));
        assert_eq!(state.counterpart_position, Some(LatLng::new(6.53, 3.38)));
        assert!(state.active_route.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_dropped() {
        let (mut session, peer) = connected().await;
        peer.emit("call.dispatched", dispatched("c2"));
        peer.emit("call.status", json!({"callId": "c2", "status": "teleported"}));
        deliver(&mut session).await;
        deliver(&mut session).await;

        assert_eq!(session.state().status, Some(CallStatus::Dispatched));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_resets_everything() {
        let (mut session, peer) = connected().await;
        let statuses = Arc::new(AtomicU32::new(0));
        let seen = statuses.clone();
        session.on_status(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        peer.emit("call.dispatched", dispatched("c2"));
        peer.emit("call.status", json!({"callId": "c2", "status": "Canceled"}));
        deliver(&mut session).await;
        deliver(&mut session).await;

        assert_eq!(session.state(), CallState::default());
        assert!(session.ambulance_id().is_none());
        assert_eq!(statuses.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_clears_callbacks() {
        let (mut session, _peer) = connected().await;
        session.on_dispatched(|_| panic!("cleared callback fired"));
        session.disconnect();
        assert!(!session.on_dispatched.is_set());
        assert!(session.state().is_idle());
    }
}
