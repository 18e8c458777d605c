//! Login-scoped owner of the real-time sessions.
//!
//! A [`SessionContext`] is created at login and dropped at logout. It holds
//! the token coordinator and at most one session per role, so nothing
//! outlives the credentials it was opened with.

use std::sync::Arc;

use tracing::info;

use crate::api::{
    ApiError, AuthenticatedClient, DispatchApi, HttpDispatchApi, HttpTokenRefresher,
    ReqwestExchange,
};
use crate::channel::{
    ChannelConfig, ConnectionManager, HostSelector, Role, Transport, WebSocketTransport,
};
use crate::config::ConfigFile;
use crate::driver::{DriverConfig, DriverSession};
use crate::rider::RiderSession;
use crate::session::{SessionCoordinator, SessionError, TokenRefresher, TokenStore};

/// Context wired to the production HTTP and WebSocket stack.
pub type HttpSessionContext = SessionContext<
    WebSocketTransport,
    HttpDispatchApi<ReqwestExchange, HttpTokenRefresher<ReqwestExchange>>,
    HttpTokenRefresher<ReqwestExchange>,
>;

/// Owns the coordinator and the per-role sessions for one login.
pub struct SessionContext<T: Transport, A: DispatchApi, R: TokenRefresher> {
    session: Arc<SessionCoordinator<R>>,
    transport: Arc<T>,
    hosts: Arc<HostSelector>,
    api: Arc<A>,
    channel: ChannelConfig,
    driver_config: DriverConfig,
    driver: Option<DriverSession<T, A>>,
    rider: Option<RiderSession<T>>,
}

impl<T: Transport, A: DispatchApi, R: TokenRefresher + 'static> SessionContext<T, A, R> {
    pub fn new(
        session: Arc<SessionCoordinator<R>>,
        transport: Arc<T>,
        hosts: Arc<HostSelector>,
        api: Arc<A>,
        channel: ChannelConfig,
        driver_config: DriverConfig,
    ) -> Self {
        Self {
            session,
            transport,
            hosts,
            api,
            channel,
            driver_config,
            driver: None,
            rider: None,
        }
    }

    pub fn session(&self) -> &Arc<SessionCoordinator<R>> {
        &self.session
    }

    pub fn hosts(&self) -> &Arc<HostSelector> {
        &self.hosts
    }

    /// The driver session, created on first use.
    pub fn driver(&mut self) -> &mut DriverSession<T, A> {
        let (transport, hosts, channel) = (&self.transport, &self.hosts, &self.channel);
        let (api, config, session) = (&self.api, &self.driver_config, &self.session);
        self.driver.get_or_insert_with(|| {
            let manager =
                ConnectionManager::new(Role::Driver, transport.clone(), hosts.clone(), channel.clone())
                    .with_credentials(session.clone());
            DriverSession::new(manager, api.clone(), config.clone())
        })
    }

    /// The rider session, created on first use.
    pub fn rider(&mut self) -> &mut RiderSession<T> {
        let (transport, hosts, channel) = (&self.transport, &self.hosts, &self.channel);
        let session = &self.session;
        self.rider.get_or_insert_with(|| {
            RiderSession::new(
                ConnectionManager::new(Role::Rider, transport.clone(), hosts.clone(), channel.clone())
                    .with_credentials(session.clone()),
            )
        })
    }

    /// Connect the driver channel with the current access token.
    pub fn connect_driver(&mut self) -> Result<&mut DriverSession<T, A>, SessionError> {
        let token = self
            .session
            .current_access_token()
            .ok_or(SessionError::NotAuthenticated)?;
        let driver = self.driver();
        driver.connect(&token);
        Ok(driver)
    }

    /// Connect the rider channel with the current access token.
    pub fn connect_rider(&mut self) -> Result<&mut RiderSession<T>, SessionError> {
        let token = self
            .session
            .current_access_token()
            .ok_or(SessionError::NotAuthenticated)?;
        let rider = self.rider();
        rider.connect(&token);
        Ok(rider)
    }

    /// Disconnect and drop both sessions, then wipe credentials.
    pub fn logout(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.disconnect();
        }
        if let Some(mut rider) = self.rider.take() {
            rider.disconnect();
        }
        self.session.logout();
        info!("Logged out");
    }
}

impl HttpSessionContext {
    /// Build the production stack from configuration.
    pub fn from_config(config: &ConfigFile, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let hosts = Arc::new(config.hosts());
        let exchange = Arc::new(ReqwestExchange::new(hosts.clone(), config.request_timeout())?);
        let paths = config.auth_paths();

        let refresher = HttpTokenRefresher::new(exchange.clone(), paths.refresh.clone());
        let session = Arc::new(SessionCoordinator::new(store, refresher));
        let client = AuthenticatedClient::new(exchange, session.clone(), paths);

        Ok(Self::new(
            session,
            Arc::new(WebSocketTransport::new()),
            hosts,
            Arc::new(HttpDispatchApi::new(client)),
            config.channel_config(),
            config.driver_config(),
        ))
    }
}
