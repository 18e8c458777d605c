//! HTTP collaborators of the real-time layer.
//!
//! Only the calls the channel sessions depend on are modelled here: call
//! lookup (patient identifier), hospital candidates and hospital routes,
//! ambulance availability, and the token refresh endpoint.
//!
//! - [`HttpExchange`] - one request, one response; [`ReqwestExchange`] in production
//! - [`AuthenticatedClient`] - bearer attachment and refresh-and-retry on 401
//! - [`DispatchApi`] - typed dispatch calls used by the driver session
//! - [`HttpTokenRefresher`] - [`TokenRefresher`](crate::session::TokenRefresher) over HTTP

mod auth;
mod client;
mod dispatch;
mod error;
mod exchange;
mod refresher;

pub use auth::{AuthPaths, AuthPolicy};
pub use client::AuthenticatedClient;
pub use dispatch::{CallDetails, DispatchApi, HttpDispatchApi};
pub use error::ApiError;
pub use exchange::{ApiRequest, ApiResponse, HttpExchange, Method, ReqwestExchange};
pub use refresher::HttpTokenRefresher;
