//! Domain types shared by both channel roles.
//!
//! - [`position`] - `LatLng` coordinate pair
//! - [`route`] - decoded `Route` and its wire form `RoutePayload`
//! - [`call`] - `CallStatus`, `CallOffer`, and the `CallState` projection
//! - [`hospital`] - hospital candidates returned by the dispatch API

mod call;
mod hospital;
mod position;
mod route;

pub(crate) use call::string_or_number;
pub use call::{CallOffer, CallState, CallStatus, UnknownStatus};
pub use hospital::Hospital;
pub use position::LatLng;
pub use route::{Route, RoutePayload, RouteStep};
