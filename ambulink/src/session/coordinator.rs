//! Single-flight token refresh.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::SessionError;
use super::tokens::{TokenPair, TokenStore};
use crate::channel::CredentialSource;

/// Exchanges a refresh token for a new token pair.
pub trait TokenRefresher: Send + Sync {
    /// Call the refresh endpoint.
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<TokenPair, SessionError>> + Send;
}

/// Owns the credentials for one login.
///
/// Refreshes are serialized by an async mutex. A caller that was rejected
/// with a token that has since been replaced gets the replacement instead of
/// triggering another refresh, so any number of concurrent 401s produce a
/// single call to the refresh endpoint.
pub struct SessionCoordinator<R: TokenRefresher> {
    store: Arc<dyn TokenStore>,
    refresher: R,
    refresh_lock: Mutex<()>,
    refresh_count: AtomicU64,
}

impl<R: TokenRefresher> SessionCoordinator<R> {
    pub fn new(store: Arc<dyn TokenStore>, refresher: R) -> Self {
        Self {
            store,
            refresher,
            refresh_lock: Mutex::new(()),
            refresh_count: AtomicU64::new(0),
        }
    }

    /// Access token to attach to requests and channel handshakes.
    pub fn current_access_token(&self) -> Option<String> {
        self.store.load().map(|t| t.access_token)
    }

    pub fn current_refresh_token(&self) -> Option<String> {
        self.store.load().map(|t| t.refresh_token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.load().is_some()
    }

    /// Store the tokens issued by a completed login.
    pub fn login(&self, tokens: TokenPair) {
        self.store.save(tokens);
        info!("Session credentials stored");
    }

    /// Wipe all stored credentials.
    pub fn logout(&self) {
        self.store.clear();
        info!("Session credentials cleared");
    }

    /// Number of calls made to the refresh endpoint.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    /// Refresh the current tokens.
    pub async fn refresh(&self) -> Result<TokenPair, SessionError> {
        let observed = self.current_access_token();
        self.refresh_after_unauthorized(observed.as_deref()).await
    }

    /// Refresh after a request carrying `rejected` was answered with 401.
    ///
    /// On failure the store is wiped (local logout) and the error returned;
    /// the caller must not retry.
    pub async fn refresh_after_unauthorized(
        &self,
        rejected: Option<&str>,
    ) -> Result<TokenPair, SessionError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.store.load();
        if let Some(current) = &current {
            if rejected != Some(current.access_token.as_str()) {
                debug!("Tokens already refreshed by a concurrent request");
                return Ok(current.clone());
            }
        }

        let Some(refresh_token) = current.map(|t| t.refresh_token) else {
            warn!("Unauthorized with no refresh token stored, logging out");
            self.store.clear();
            return Err(SessionError::NoRefreshToken);
        };

        self.refresh_count.fetch_add(1, Ordering::SeqCst);
        match self.refresher.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.store.save(tokens.clone());
                info!("Access token refreshed");
                Ok(tokens)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, logging out");
                self.store.clear();
                Err(e)
            }
        }
    }
}

/// Channels reconnect with whatever access token is current.
impl<R: TokenRefresher + 'static> CredentialSource for SessionCoordinator<R> {
    fn current_credential(&self) -> Option<String> {
        self.current_access_token()
    }
}
