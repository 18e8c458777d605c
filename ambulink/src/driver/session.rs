//! Driver session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::broadcast::{LocationBroadcastLoop, DEFAULT_BROADCAST_INTERVAL};
use super::error::DispatchError;
use super::events::{
    CallComplete, CallResponse, DriverEvent, LocationRequest, LocationResponse, RouteEvent,
    CALL_COMPLETE, CALL_RESPOND, LOCATION_RESPONSE,
};
use super::offer::OfferSlot;
use crate::api::DispatchApi;
use crate::call::{self, CallError, CallStateMachine, CallUpdate};
use crate::channel::{ChannelError, ChannelEvent, ChannelHandle, ConnectionManager, Slot, Transport};
use crate::model::{CallOffer, CallState, CallStatus, Hospital, LatLng, Route};

/// Driver session tuning.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub broadcast_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            broadcast_interval: DEFAULT_BROADCAST_INTERVAL,
        }
    }
}

/// The driver side of the real-time layer.
///
/// Owns the `/drivers` channel, the pending offer, the call state and the
/// position broadcast. All methods are meant to be called from one owner;
/// inbound events are drained with [`next_event`](Self::next_event) and
/// applied with [`handle_event`](Self::handle_event).
pub struct DriverSession<T: Transport, A: DispatchApi> {
    manager: ConnectionManager<T>,
    api: Arc<A>,
    config: DriverConfig,
    offers: OfferSlot,
    machine: CallStateMachine,
    position: watch::Sender<Option<LatLng>>,
    broadcast: Option<CancellationToken>,
    on_connection: Slot<bool>,
    on_offer: Slot<CallOffer>,
    on_route: Slot<Route>,
    on_location_request: Slot<LocationRequest>,
}

impl<T: Transport, A: DispatchApi> DriverSession<T, A> {
    pub fn new(manager: ConnectionManager<T>, api: Arc<A>, config: DriverConfig) -> Self {
        let (position, _) = watch::channel(None);
        Self {
            manager,
            api,
            config,
            offers: OfferSlot::new(),
            machine: CallStateMachine::new(),
            position,
            broadcast: None,
            on_connection: Slot::new(),
            on_offer: Slot::new(),
            on_route: Slot::new(),
            on_location_request: Slot::new(),
        }
    }

    /// Open the channel and start the position broadcast.
    pub fn connect(&mut self, credential: &str) {
        self.manager.connect(credential);

        if self.broadcast.is_none() {
            let shutdown = CancellationToken::new();
            let broadcast = LocationBroadcastLoop::new(
                self.manager.handle(),
                self.machine.subscribe(),
                self.position.subscribe(),
            )
            .with_interval(self.config.broadcast_interval);
            tokio::spawn(broadcast.run(shutdown.clone()));
            self.broadcast = Some(shutdown);
        }
    }

    /// Close the channel and end the call locally.
    ///
    /// The call state is reset and the broadcast cancelled before this
    /// returns, so no further `location.update` goes out. Registered
    /// callbacks are cleared.
    pub fn disconnect(&mut self) {
        self.machine.reset();
        if let Some(shutdown) = self.broadcast.take() {
            shutdown.cancel();
        }
        self.manager.disconnect();
        self.offers.clear();
        self.clear_callbacks();
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    pub fn handle(&self) -> ChannelHandle {
        self.manager.handle()
    }

    /// Answer an offer.
    ///
    /// Refused locally when disconnected: an offer is never answered over a
    /// channel other than the one that delivered it.
    pub fn respond(&mut self, call_id: &str, accept: bool) -> Result<(), DispatchError> {
        self.send_response(call_id, accept).map(|_| ())
    }

    /// Accept an offer, enter the pickup leg and load the call details.
    pub async fn accept_call(&mut self, call_id: &str) -> Result<(), DispatchError> {
        let offer = self.send_response(call_id, true)?;
        self.machine.apply(CallUpdate::Accepted {
            call_id: call_id.to_string(),
            pickup: offer.map(|o| o.origin()),
        })?;
        self.load_call_details(call_id).await;
        Ok(())
    }

    pub fn decline_call(&mut self, call_id: &str) -> Result<(), DispatchError> {
        self.send_response(call_id, false)?;
        Ok(())
    }

    /// Finish the call. Only valid on the hospital leg.
    pub fn complete_call(&mut self, call_id: &str) -> Result<(), DispatchError> {
        let update = CallUpdate::Complete {
            call_id: call_id.to_string(),
        };
        let mut probe = self.machine.snapshot();
        call::apply(&mut probe, update.clone())?;

        self.emit(
            CALL_COMPLETE,
            &CallComplete {
                call_id: call_id.to_string(),
            },
        )?;
        self.machine.apply(update)?;
        info!(call_id = %call_id, "Call completed");
        Ok(())
    }

    /// Record a new position fix. Invalid coordinates are ignored.
    pub fn update_location(&self, position: LatLng) {
        if !position.is_valid() {
            warn!(position = %position, "Ignoring invalid position fix");
            return;
        }
        self.position.send_replace(Some(position));
    }

    pub fn position(&self) -> Option<LatLng> {
        *self.position.borrow()
    }

    /// Manually step the call forward (en route, arrived).
    pub fn advance_status(&mut self, call_id: &str, status: CallStatus) -> Result<(), DispatchError> {
        self.machine.apply(CallUpdate::Advance {
            call_id: call_id.to_string(),
            status,
        })?;
        info!(call_id = %call_id, status = %status, "Call status advanced");
        Ok(())
    }

    /// Choose a hospital after arrival and switch to the hospital leg.
    pub async fn select_hospital(&mut self, hospital: Hospital) -> Result<(), DispatchError> {
        let state = self.machine.snapshot();
        let call_id = state.call_id.clone().ok_or(CallError::NoActiveCall)?;
        if state.status != Some(CallStatus::Arrived) {
            let err = CallError::NotArrived {
                current: state.status.map_or_else(|| "idle".to_string(), |s| s.to_string()),
            };
            self.report_error(err.to_string());
            return Err(err.into());
        }
        let origin = self.require_position()?;

        let payload = match self.api.hospital_route(&call_id, &hospital.id, origin).await {
            Ok(payload) => payload,
            Err(e) => {
                self.report_error(format!("Could not load hospital route: {}", e));
                return Err(e.into());
            }
        };

        info!(call_id = %call_id, hospital = %hospital.name, "Hospital selected");
        self.machine.apply(CallUpdate::HospitalSelected {
            call_id,
            hospital,
            route: Route::from_payload(&payload),
        })?;
        Ok(())
    }

    /// Hospitals near the current position.
    pub async fn nearby_hospitals(&self) -> Result<Vec<Hospital>, DispatchError> {
        let position = self.require_position()?;
        Ok(self.api.nearby_hospitals(position).await?)
    }

    pub async fn set_availability(&self, available: bool) -> Result<(), DispatchError> {
        self.api.set_availability(available).await?;
        info!(available, "Availability updated");
        Ok(())
    }

    /// Next inbound event, in arrival order. `None` once disconnected.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.manager.next_event().await
    }

    /// Fold one inbound event into the session.
    pub fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::ConnectionChanged(connected) => {
                debug!(connected, "Driver channel connection changed");
                self.on_connection.fire(&connected);
            }
            ChannelEvent::Message(frame) => match DriverEvent::from_frame(&frame) {
                Ok(Some(event)) => self.apply_event(event),
                Ok(None) => debug!(event = %frame.event, "Ignoring unhandled driver event"),
                Err(e) => warn!(event = %frame.event, error = %e, "Dropping malformed driver event"),
            },
        }
    }

    pub fn pending_offer(&self) -> Option<&CallOffer> {
        self.offers.pending()
    }

    pub fn state(&self) -> CallState {
        self.machine.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        self.machine.subscribe()
    }

    pub fn on_connection_changed<F>(&mut self, handler: F)
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.on_connection.set(handler);
    }

    pub fn on_offer<F>(&mut self, handler: F)
    where
        F: Fn(&CallOffer) + Send + Sync + 'static,
    {
        self.on_offer.set(handler);
    }

    pub fn on_route<F>(&mut self, handler: F)
    where
        F: Fn(&Route) + Send + Sync + 'static,
    {
        self.on_route.set(handler);
    }

    pub fn on_location_request<F>(&mut self, handler: F)
    where
        F: Fn(&LocationRequest) + Send + Sync + 'static,
    {
        self.on_location_request.set(handler);
    }

    fn clear_callbacks(&mut self) {
        self.on_connection.clear();
        self.on_offer.clear();
        self.on_route.clear();
        self.on_location_request.clear();
    }

    fn apply_event(&mut self, event: DriverEvent) {
        match event {
            DriverEvent::Offer(offer) => {
                info!(
                    call_id = %offer.call_id,
                    priority = %offer.priority,
                    distance_m = offer.distance_meters,
                    "Call offer received"
                );
                self.offers.offer(offer.clone());
                self.on_offer.fire(&offer);
            }
            DriverEvent::Route(event) | DriverEvent::RouteUpdate(event) => self.apply_route(event),
            DriverEvent::LocationRequest(request) => {
                self.on_location_request.fire(&request);
                self.answer_location_request(&request);
            }
        }
    }

    fn apply_route(&mut self, event: RouteEvent) {
        let route = event.route.as_ref().and_then(Route::from_payload);
        if let Some(route) = &route {
            debug!(
                call_id = %event.call_id,
                points = route.point_count(),
                distance_m = route.distance_meters,
                "Route received"
            );
            self.on_route.fire(route);
        }
        if let Err(e) = self.machine.apply(CallUpdate::Route {
            call_id: event.call_id,
            route,
        }) {
            warn!(error = %e, "Route update rejected");
        }
    }

    /// Reply to `location.request` from the latest fix. Call state is not
    /// touched.
    fn answer_location_request(&self, request: &LocationRequest) {
        let Some(position) = self.position() else {
            debug!(request_id = %request.request_id, "No fix for location request");
            return;
        };
        let response = LocationResponse {
            request_id: request.request_id.clone(),
            latitude: position.latitude,
            longitude: position.longitude,
        };
        if let Err(e) = self.manager.handle().emit_event(LOCATION_RESPONSE, &response) {
            debug!(request_id = %request.request_id, error = %e, "Location response dropped");
        }
    }

    fn send_response(&mut self, call_id: &str, accept: bool) -> Result<Option<CallOffer>, DispatchError> {
        self.emit(
            CALL_RESPOND,
            &CallResponse {
                call_id: call_id.to_string(),
                accept,
            },
        )?;
        info!(call_id = %call_id, accept, "Call response sent");
        Ok(self.offers.take(call_id))
    }

    fn emit<P: serde::Serialize>(&self, event: &str, payload: &P) -> Result<(), DispatchError> {
        if !self.manager.is_connected() {
            warn!(event = %event, "Refusing to send while disconnected");
            self.report_error("Not connected to dispatch".to_string());
            return Err(DispatchError::NotConnected);
        }
        match self.manager.handle().emit_event(event, payload) {
            Ok(()) => Ok(()),
            Err(ChannelError::NotConnected) => {
                self.report_error("Not connected to dispatch".to_string());
                Err(DispatchError::NotConnected)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn load_call_details(&self, call_id: &str) {
        let details = match self.api.call_details(call_id).await {
            Ok(details) => details,
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "Could not load call details");
                self.report_error(format!("Could not load call details: {}", e));
                return;
            }
        };

        if let Some(patient_id) = details.patient_id {
            if let Err(e) = self.machine.apply(CallUpdate::PatientIdentified {
                call_id: call_id.to_string(),
                patient_id,
            }) {
                debug!(call_id = %call_id, error = %e, "Discarding stale call details");
                return;
            }
        }

        let state = self.machine.snapshot();
        if let Some(payload) = details.route {
            if state.is_for(call_id) && state.active_route.is_none() {
                if let Err(e) = self.machine.apply(CallUpdate::Route {
                    call_id: call_id.to_string(),
                    route: Route::from_payload(&payload),
                }) {
                    debug!(call_id = %call_id, error = %e, "Discarding pickup route from call details");
                }
            }
        }
    }

    fn require_position(&self) -> Result<LatLng, DispatchError> {
        self.position().ok_or_else(|| {
            self.report_error("Current location unavailable".to_string());
            DispatchError::NoPosition
        })
    }

    fn report_error(&self, message: String) {
        let _ = self.machine.apply(CallUpdate::Error(message));
    }
}

impl<T: Transport, A: DispatchApi> Drop for DriverSession<T, A> {
    fn drop(&mut self) {
        if let Some(shutdown) = self.broadcast.take() {
            shutdown.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, CallDetails};
    use crate::channel::memory::{MemoryPeer, MemoryServer, MemoryTransport};
    use crate::channel::{ChannelConfig, HostSelector, Role};
    use crate::model::RoutePayload;
    use serde_json::json;
    use std::sync::Mutex;

    const POLYLINE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    #[derive(Default)]
    struct FakeApi {
        hospital_routes: Mutex<Vec<String>>,
        pickup_route: Option<RoutePayload>,
    }

    impl DispatchApi for FakeApi {
        async fn call_details(&self, call_id: &str) -> Result<CallDetails, ApiError> {
            Ok(CallDetails {
                id: call_id.to_string(),
                patient_id: Some("patient-7".to_string()),
                status: None,
                route: self.pickup_route.clone(),
            })
        }

        async fn nearby_hospitals(&self, _position: LatLng) -> Result<Vec<Hospital>, ApiError> {
            Ok(vec![hospital()])
        }

        async fn hospital_route(
            &self,
            _call_id: &str,
            hospital_id: &str,
            _origin: LatLng,
        ) -> Result<RoutePayload, ApiError> {
            self.hospital_routes.lock().unwrap().push(hospital_id.to_string());
            Ok(RoutePayload {
                polyline: POLYLINE.to_string(),
                distance: 5000.0,
                duration: 600.0,
                steps: vec![],
            })
        }

        async fn set_availability(&self, _available: bool) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn hospital() -> Hospital {
        Hospital {
            id: "h1".to_string(),
            name: "General".to_string(),
            latitude: 6.45,
            longitude: 3.39,
            distance: Some(1200.0),
        }
    }

    fn session() -> (DriverSession<MemoryTransport, FakeApi>, MemoryServer, Arc<FakeApi>) {
        session_with(FakeApi::default())
    }

    fn session_with(
        api: FakeApi,
    ) -> (DriverSession<MemoryTransport, FakeApi>, MemoryServer, Arc<FakeApi>) {
        let (transport, server) = MemoryTransport::new();
        let manager = ConnectionManager::new(
            Role::Driver,
            Arc::new(transport),
            Arc::new(HostSelector::new("http://dispatch.test", None)),
            ChannelConfig::default(),
        );
        let api = Arc::new(api);
        (
            DriverSession::new(manager, api.clone(), DriverConfig::default()),
            server,
            api,
        )
    }

    async fn connected() -> (DriverSession<MemoryTransport, FakeApi>, MemoryPeer, Arc<FakeApi>) {
        connected_with(FakeApi::default()).await
    }

    async fn connected_with(
        api: FakeApi,
    ) -> (DriverSession<MemoryTransport, FakeApi>, MemoryPeer, Arc<FakeApi>) {
        let (mut session, mut server, api) = session_with(api);
        session.connect("tok");
        let event = session.next_event().await.unwrap();
        assert_eq!(event, ChannelEvent::ConnectionChanged(true));
        session.handle_event(event);
        let peer = server.accept().await.unwrap();
        (session, peer, api)
    }

    async fn deliver(session: &mut DriverSession<MemoryTransport, FakeApi>) {
        let event = session.next_event().await.unwrap();
        session.handle_event(event);
    }

    fn offer(call_id: &str) -> serde_json::Value {
        json!({
            "callId": call_id,
            "description": "Fall",
            "latitude": 6.6,
            "longitude": 3.3,
            "distance": 900,
            "duration": 180,
            "priority": "high"
        })
    }

    async fn next_non_location(peer: &mut MemoryPeer) -> crate::channel::Frame {
        loop {
            let frame = peer.recv().await.unwrap();
            if frame.event != "location.update" {
                return frame;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_respond_refused_when_disconnected() {
        let (mut session, _server, _api) = session();
        let err = session.respond("c1", true).unwrap_err();
        assert!(matches!(err, DispatchError::NotConnected));
        assert_eq!(session.state().error.as_deref(), Some("Not connected to dispatch"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_loads_patient() {
        let (mut session, mut peer, _api) = connected().await;
        peer.emit("call.offer", offer("c1"));
        deliver(&mut session).await;
        assert_eq!(session.pending_offer().unwrap().call_id, "c1");

        session.accept_call("c1").await.unwrap();
        assert!(session.pending_offer().is_none());

        let state = session.state();
        assert!(state.is_for("c1"));
        assert_eq!(state.status, Some(CallStatus::Dispatched));
        assert_eq!(state.patient_id.as_deref(), Some("patient-7"));
        assert_eq!(state.counterpart_position, Some(LatLng::new(6.6, 3.3)));

        let frame = next_non_location(&mut peer).await;
        assert_eq!(frame.event, "call.respond");
        assert_eq!(frame.data, json!({"callId": "c1", "accept": true}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_adopts_pickup_route_from_details() {
        let api = FakeApi {
            pickup_route: Some(RoutePayload {
                polyline: POLYLINE.to_string(),
                distance: 900.0,
                duration: 180.0,
                steps: vec![],
            }),
            ..FakeApi::default()
        };
        let (mut session, mut peer, _api) = connected_with(api).await;
        peer.emit("call.offer", offer("c1"));
        deliver(&mut session).await;

        session.accept_call("c1").await.unwrap();
        let route = session.state().active_route.unwrap();
        assert_eq!(route.points.len(), 3);
        assert_eq!(route.distance_meters, 900.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decline_clears_offer() {
        let (mut session, mut peer, _api) = connected().await;
        peer.emit("call.offer", offer("c1"));
        deliver(&mut session).await;

        session.decline_call("c1").unwrap();
        assert!(session.pending_offer().is_none());
        assert!(session.state().is_idle());

        let frame = next_non_location(&mut peer).await;
        assert_eq!(frame.data, json!({"callId": "c1", "accept": false}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_leg_sequence() {
        let (mut session, mut peer, api) = connected().await;
        session.update_location(LatLng::new(6.5, 3.35));
        peer.emit("call.offer", offer("c1"));
        deliver(&mut session).await;
        session.accept_call("c1").await.unwrap();

        // Hospital selection needs arrival.
        assert!(session.select_hospital(hospital()).await.is_err());

        session.advance_status("c1", CallStatus::EnRoute).unwrap();
        session.advance_status("c1", CallStatus::Arrived).unwrap();
        session.select_hospital(hospital()).await.unwrap();
        assert_eq!(*api.hospital_routes.lock().unwrap(), vec!["h1".to_string()]);

        let state = session.state();
        assert_eq!(state.status, Some(CallStatus::NavigatingToHospital));
        assert!(state.hospital_route.as_ref().unwrap().point_count() > 0);
        assert!(state.active_route.is_none());

        session.complete_call("c1").unwrap();
        assert_eq!(session.state(), CallState::default());

        // Let the channel worker flush the outbound queue.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let mut events = Vec::new();
        while let Some(frame) = peer.try_recv() {
            if frame.event != "location.update" {
                events.push(frame.event);
            }
        }
        assert_eq!(events, vec!["call.respond", "call.complete"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_rejected_before_hospital_leg() {
        let (mut session, mut peer, _api) = connected().await;
        peer.emit("call.offer", offer("c1"));
        deliver(&mut session).await;
        session.accept_call("c1").await.unwrap();

        assert!(matches!(
            session.complete_call("c1"),
            Err(DispatchError::Call(CallError::InvalidTransition { .. }))
        ));
        assert!(session.state().is_for("c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_hospital_without_position() {
        let (mut session, _peer, _api) = connected().await;
        session
            .machine
            .apply(CallUpdate::Status {
                call_id: "c1".to_string(),
                status: CallStatus::Arrived,
            })
            .unwrap();

        let err = session.select_hospital(hospital()).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoPosition));
        assert_eq!(
            session.state().error.as_deref(),
            Some("Current location unavailable")
        );
        assert!(session.nearby_hospitals().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_request_is_answered_without_state_change() {
        let (mut session, mut peer, _api) = connected().await;
        session.update_location(LatLng::new(6.5, 3.35));

        peer.emit("location.request", json!({"requestId": "r1"}));
        deliver(&mut session).await;

        let frame = peer.recv().await.unwrap();
        assert_eq!(frame.event, "location.response");
        assert_eq!(
            frame.data,
            json!({"requestId": "r1", "latitude": 6.5, "longitude": 3.35})
        );
        assert!(session.state().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_event_is_dropped() {
        let (mut session, peer, _api) = connected().await;
        peer.emit("call.offer", json!({"description": "missing id"}));
        peer.emit("call.offer", offer("c2"));

        deliver(&mut session).await;
        assert!(session.pending_offer().is_none());
        deliver(&mut session).await;
        assert_eq!(session.pending_offer().unwrap().call_id, "c2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_clears_callbacks() {
        let (mut session, _peer, _api) = connected().await;
        session.on_offer(|_| panic!("cleared callback fired"));
        session.disconnect();

        assert!(!session.on_offer.is_set());
        assert!(!session.is_connected());
        assert!(session.next_event().await.is_none());
    }
}
