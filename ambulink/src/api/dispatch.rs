//! Dispatch API calls consumed by the driver session.

use std::future::Future;

use serde::Deserialize;
use serde_json::json;

use super::client::AuthenticatedClient;
use super::error::ApiError;
use super::exchange::{ApiRequest, HttpExchange, Method};
use crate::model::{Hospital, LatLng, RoutePayload};
use crate::session::TokenRefresher;

/// Call record returned by the call-by-id lookup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallDetails {
    #[serde(alias = "callId")]
    pub id: String,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Pickup route, if the server has already computed one.
    #[serde(default)]
    pub route: Option<RoutePayload>,
}

/// Dispatch operations backed by the request/response API.
pub trait DispatchApi: Send + Sync {
    /// Look up a call, chiefly to obtain the patient identifier.
    fn call_details(
        &self,
        call_id: &str,
    ) -> impl Future<Output = Result<CallDetails, ApiError>> + Send;

    /// Hospitals near `position`.
    fn nearby_hospitals(
        &self,
        position: LatLng,
    ) -> impl Future<Output = Result<Vec<Hospital>, ApiError>> + Send;

    /// Route from `origin` to the chosen hospital.
    fn hospital_route(
        &self,
        call_id: &str,
        hospital_id: &str,
        origin: LatLng,
    ) -> impl Future<Output = Result<RoutePayload, ApiError>> + Send;

    /// Mark the ambulance available or unavailable for new calls.
    fn set_availability(&self, available: bool)
        -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// [`DispatchApi`] over the authenticated HTTP client.
pub struct HttpDispatchApi<X: HttpExchange, R: TokenRefresher> {
    client: AuthenticatedClient<X, R>,
}

impl<X: HttpExchange, R: TokenRefresher> HttpDispatchApi<X, R> {
    pub fn new(client: AuthenticatedClient<X, R>) -> Self {
        Self { client }
    }
}

impl<X: HttpExchange, R: TokenRefresher> DispatchApi for HttpDispatchApi<X, R> {
    async fn call_details(&self, call_id: &str) -> Result<CallDetails, ApiError> {
        self.client
            .json(ApiRequest::get(format!("/calls/{}", call_id)))
            .await
    }

    async fn nearby_hospitals(&self, position: LatLng) -> Result<Vec<Hospital>, ApiError> {
        let request = ApiRequest::get("/hospitals")
            .with_query("latitude", position.latitude)
            .with_query("longitude", position.longitude);
        self.client.json(request).await
    }

    async fn hospital_route(
        &self,
        call_id: &str,
        hospital_id: &str,
        origin: LatLng,
    ) -> Result<RoutePayload, ApiError> {
        let request = ApiRequest::new(Method::Post, format!("/calls/{}/hospital-route", call_id))
            .with_body(json!({
                "hospitalId": hospital_id,
                "latitude": origin.latitude,
                "longitude": origin.longitude,
            }));
        self.client.json(request).await
    }

    async fn set_availability(&self, available: bool) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::Patch, "/ambulances/availability")
            .with_body(json!({ "available": available }));
        self.client.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiResponse, AuthPaths};
    use crate::session::{MemoryTokenStore, SessionCoordinator, SessionError, TokenPair};
    use std::sync::{Arc, Mutex};

    struct ScriptedExchange {
        body: String,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl HttpExchange for ScriptedExchange {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
            self.requests.lock().unwrap().push(request);
            Ok(ApiResponse::new(200, self.body.as_bytes().to_vec()))
        }
    }

    struct NoRefresh;

    impl TokenRefresher for NoRefresh {
        async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair, SessionError> {
            Err(SessionError::NoRefreshToken)
        }
    }

    fn api(body: &str) -> (HttpDispatchApi<ScriptedExchange, NoRefresh>, Arc<ScriptedExchange>) {
        let exchange = Arc::new(ScriptedExchange {
            body: body.to_string(),
            requests: Mutex::new(Vec::new()),
        });
        let store = Arc::new(MemoryTokenStore::with_tokens(TokenPair::new("a", "r")));
        let session = Arc::new(SessionCoordinator::new(store, NoRefresh));
        let client = AuthenticatedClient::new(exchange.clone(), session, AuthPaths::default());
        (HttpDispatchApi::new(client), exchange)
    }

    #[tokio::test]
    async fn test_call_details() {
        let (api, exchange) = api(r#"{"id": "c1", "patientId": "p-77", "status": "dispatched"}"#);

        let details = api.call_details("c1").await.unwrap();
        assert_eq!(details.patient_id.as_deref(), Some("p-77"));
        assert!(details.route.is_none());

        let requests = exchange.requests.lock().unwrap();
        assert_eq!(requests[0].path, "/calls/c1");
        assert_eq!(requests[0].bearer.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_hospital_route_request_shape() {
        let (api, exchange) = api(r#"{"polyline": "??", "distance": 900, "duration": 120}"#);

        let route = api
            .hospital_route("c1", "h3", LatLng::new(6.5, 3.4))
            .await
            .unwrap();
        assert_eq!(route.distance, 900.0);

        let requests = exchange.requests.lock().unwrap();
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].path, "/calls/c1/hospital-route");
        assert_eq!(requests[0].body.as_ref().unwrap()["hospitalId"], "h3");
    }

    #[tokio::test]
    async fn test_nearby_hospitals() {
        let (api, exchange) = api(
            r#"[{"id": "h1", "name": "General", "latitude": 6.45, "longitude": 3.39, "distance": 1200}]"#,
        );

        let hospitals = api.nearby_hospitals(LatLng::new(6.5, 3.4)).await.unwrap();
        assert_eq!(hospitals.len(), 1);
        assert_eq!(hospitals[0].name, "General");
        assert_eq!(exchange.requests.lock().unwrap()[0].query.len(), 2);
    }

    #[tokio::test]
    async fn test_set_availability() {
        let (api, exchange) = api("");

        api.set_availability(true).await.unwrap();

        let requests = exchange.requests.lock().unwrap();
        assert_eq!(requests[0].method, Method::Patch);
        assert_eq!(requests[0].body.as_ref().unwrap()["available"], true);
    }
}
