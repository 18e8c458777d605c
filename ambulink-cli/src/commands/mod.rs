//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration file management (init, path, show)
//! - [`driver`] - Driver console (offers, routes, position broadcast)
//! - [`polyline`] - Polyline encode and decode
//! - [`rider`] - Rider console (dispatch and tracking)

pub mod common;
pub mod config;
pub mod driver;
pub mod polyline;
pub mod rider;
