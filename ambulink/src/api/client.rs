//! Authenticated HTTP client.
//!
//! Attaches the credential each endpoint expects and recovers from an
//! expired access token by refreshing once through the
//! [`SessionCoordinator`] and replaying the original request once.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::auth::{AuthPaths, AuthPolicy};
use super::error::ApiError;
use super::exchange::{ApiRequest, ApiResponse, HttpExchange};
use crate::session::{SessionCoordinator, SessionError, TokenRefresher};

const UNAUTHORIZED: u16 = 401;

/// HTTP client bound to one login session.
pub struct AuthenticatedClient<X: HttpExchange, R: TokenRefresher> {
    exchange: Arc<X>,
    session: Arc<SessionCoordinator<R>>,
    paths: AuthPaths,
}

impl<X: HttpExchange, R: TokenRefresher> AuthenticatedClient<X, R> {
    pub fn new(exchange: Arc<X>, session: Arc<SessionCoordinator<R>>, paths: AuthPaths) -> Self {
        Self {
            exchange,
            session,
            paths,
        }
    }

    pub fn session(&self) -> &Arc<SessionCoordinator<R>> {
        &self.session
    }

    /// Execute a request with credentials attached.
    ///
    /// Returns the response whatever its status, except that a 401 on an
    /// access-token request is answered by a single refresh and replay, and a
    /// 401 on the refresh endpoint logs the session out.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let policy = self.paths.policy_for(&request.path);
        let credential = match policy {
            AuthPolicy::Anonymous => None,
            AuthPolicy::RefreshToken => self.session.current_refresh_token(),
            AuthPolicy::AccessToken => self.session.current_access_token(),
        };
        request.bearer = credential.clone();

        let response = self.exchange.execute(request.clone()).await?;
        if response.status != UNAUTHORIZED {
            return Ok(response);
        }

        match policy {
            AuthPolicy::Anonymous => Ok(response),
            AuthPolicy::RefreshToken => {
                warn!(path = %request.path, "Refresh endpoint rejected credentials, logging out");
                self.session.logout();
                Err(ApiError::SessionExpired(SessionError::RefreshRejected {
                    status: UNAUTHORIZED,
                }))
            }
            AuthPolicy::AccessToken => {
                debug!(path = %request.path, "Access token rejected, refreshing");
                let tokens = self
                    .session
                    .refresh_after_unauthorized(credential.as_deref())
                    .await?;
                request.bearer = Some(tokens.access_token);
                self.exchange.execute(request).await
            }
        }
    }

    /// Execute and decode a 2xx JSON body.
    pub async fn json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        self.execute(request).await?.json(&path)
    }

    /// Execute and require a 2xx status, ignoring the body.
    pub async fn send(&self, request: ApiRequest) -> Result<(), ApiError> {
        let path = request.path.clone();
        self.execute(request).await?.ensure_success(&path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::session::{MemoryTokenStore, TokenPair, TokenStore};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Exchange that accepts only the `valid` access token.
    struct TokenCheckingExchange {
        valid: String,
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    impl TokenCheckingExchange {
        fn accepting(valid: &str) -> Arc<Self> {
            Arc::new(Self {
                valid: valid.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<(String, Option<String>)> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl HttpExchange for TokenCheckingExchange {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.path.clone(), request.bearer.clone()));
            tokio::time::sleep(Duration::from_millis(5)).await;

            let authorized = request.path.starts_with("/auth/login")
                || request.bearer.as_deref() == Some(self.valid.as_str());
            if authorized {
                Ok(ApiResponse::new(200, br#"{"ok": true}"#.to_vec()))
            } else {
                Ok(ApiResponse::new(401, Vec::new()))
            }
        }
    }

    struct FixedRefresher {
        calls: AtomicU64,
        result: Result<TokenPair, SessionError>,
    }

    impl TokenRefresher for FixedRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair, SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.result.clone()
        }
    }

    fn client(
        exchange: Arc<TokenCheckingExchange>,
        stored: Option<TokenPair>,
        result: Result<TokenPair, SessionError>,
    ) -> (
        AuthenticatedClient<TokenCheckingExchange, FixedRefresher>,
        Arc<MemoryTokenStore>,
    ) {
        let store = Arc::new(match stored {
            Some(t) => MemoryTokenStore::with_tokens(t),
            None => MemoryTokenStore::new(),
        });
        let refresher = FixedRefresher {
            calls: AtomicU64::new(0),
            result,
        };
        let session = Arc::new(SessionCoordinator::new(store.clone(), refresher));
        (
            AuthenticatedClient::new(exchange, session, AuthPaths::default()),
            store,
        )
    }

    #[tokio::test]
    async fn test_attaches_access_token() {
        let exchange = TokenCheckingExchange::accepting("good");
        let (client, _) = client(
            exchange.clone(),
            Some(TokenPair::new("good", "r")),
            Err(SessionError::NoRefreshToken),
        );

        let response = client.execute(ApiRequest::get("/calls/c1")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            exchange.seen(),
            vec![("/calls/c1".to_string(), Some("good".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_login_is_anonymous() {
        let exchange = TokenCheckingExchange::accepting("good");
        let (client, _) = client(
            exchange.clone(),
            Some(TokenPair::new("good", "r")),
            Err(SessionError::NoRefreshToken),
        );

        client
            .execute(ApiRequest::new(Method::Post, "/auth/login"))
            .await
            .unwrap();
        assert_eq!(exchange.seen()[0].1, None);
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let exchange = TokenCheckingExchange::accepting("new");
        let (client, store) = client(
            exchange.clone(),
            Some(TokenPair::new("old", "r")),
            Ok(TokenPair::new("new", "r2")),
        );

        let (first, second) = tokio::join!(
            client.execute(ApiRequest::get("/calls/c1")),
            client.execute(ApiRequest::get("/hospitals")),
        );

        assert_eq!(first.unwrap().status, 200);
        assert_eq!(second.unwrap().status, 200);
        assert_eq!(client.session().refresh_count(), 1);
        assert_eq!(store.load(), Some(TokenPair::new("new", "r2")));

        let retries: Vec<_> = exchange
            .seen()
            .into_iter()
            .filter(|(_, bearer)| bearer.as_deref() == Some("new"))
            .collect();
        assert_eq!(retries.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_logs_out() {
        let exchange = TokenCheckingExchange::accepting("new");
        let (client, store) = client(
            exchange.clone(),
            Some(TokenPair::new("old", "r")),
            Err(SessionError::RefreshRejected { status: 401 }),
        );

        let result = client.execute(ApiRequest::get("/calls/c1")).await;

        assert!(matches!(result, Err(ApiError::SessionExpired(_))));
        assert!(store.load().is_none());
        // Original request only; no replay after a failed refresh.
        assert_eq!(exchange.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_endpoint_401_logs_out_without_refresh() {
        let exchange = TokenCheckingExchange::accepting("never");
        let (client, store) = client(
            exchange.clone(),
            Some(TokenPair::new("old", "r")),
            Ok(TokenPair::new("new", "r2")),
        );

        let result = client
            .execute(ApiRequest::new(Method::Post, "/auth/refresh"))
            .await;

        assert!(result.unwrap_err().is_session_expired());
        assert_eq!(client.session().refresh_count(), 0);
        assert!(store.load().is_none());
        assert_eq!(exchange.seen()[0].1.as_deref(), Some("r"));
    }
}
