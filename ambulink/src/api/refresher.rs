//! Token refresh over HTTP.

use std::sync::Arc;

use serde_json::json;

use super::exchange::{ApiRequest, HttpExchange, Method};
use crate::session::{SessionError, TokenPair, TokenRefresher};

/// Calls the refresh endpoint directly, bypassing [`AuthenticatedClient`](super::AuthenticatedClient)
/// so a rejected refresh can never recurse into another refresh.
pub struct HttpTokenRefresher<X: HttpExchange> {
    exchange: Arc<X>,
    path: String,
}

impl<X: HttpExchange> HttpTokenRefresher<X> {
    pub fn new(exchange: Arc<X>, path: impl Into<String>) -> Self {
        Self {
            exchange,
            path: path.into(),
        }
    }
}

impl<X: HttpExchange> TokenRefresher for HttpTokenRefresher<X> {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let mut request = ApiRequest::new(Method::Post, self.path.clone())
            .with_body(json!({ "refreshToken": refresh_token }));
        request.bearer = Some(refresh_token.to_string());

        let response = self
            .exchange
            .execute(request)
            .await
            .map_err(|e| SessionError::RefreshFailed(e.to_string()))?;

        match response.status {
            401 | 403 => Err(SessionError::RefreshRejected {
                status: response.status,
            }),
            _ => response
                .json::<TokenPair>(&self.path)
                .map_err(|e| SessionError::RefreshFailed(e.to_string())),
        }
    }
}
