//! Helpers shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use ambulink::config::ConfigFile;
use ambulink::logging::{init_logging_to, LoggingGuard};
use ambulink::model::{CallState, LatLng};
use ambulink::session::{MemoryTokenStore, TokenPair, TokenStore};
use tokio_util::sync::CancellationToken;

use crate::error::CliError;

pub fn load_config(path: &Path) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(path)?)
}

pub fn init_logging(config: &ConfigFile, verbose: bool) -> Result<LoggingGuard, CliError> {
    init_logging_to(&config.logging.file, verbose).map_err(|e| CliError::LoggingInit(e.to_string()))
}

/// Token store seeded from the command line.
pub fn token_store(access_token: String, refresh_token: String) -> Arc<dyn TokenStore> {
    Arc::new(MemoryTokenStore::with_tokens(TokenPair::new(
        access_token,
        refresh_token,
    )))
}

/// Token cancelled on Ctrl+C.
pub fn shutdown_token() -> Result<CancellationToken, CliError> {
    let shutdown = CancellationToken::new();
    let handle = shutdown.clone();
    ctrlc::set_handler(move || handle.cancel())
        .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;
    Ok(shutdown)
}

/// Parse a `lat,lng` pair.
pub fn parse_point(text: &str) -> Result<LatLng, CliError> {
    let invalid = || CliError::InvalidArgument(format!("'{}' is not a lat,lng pair", text));

    let (lat, lng) = text.split_once(',').ok_or_else(invalid)?;
    let latitude: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let longitude: f64 = lng.trim().parse().map_err(|_| invalid())?;

    checked_point(latitude, longitude)
}

/// Build a point, rejecting coordinates outside the valid range.
pub fn checked_point(latitude: f64, longitude: f64) -> Result<LatLng, CliError> {
    let point = LatLng::new(latitude, longitude);
    if !point.is_valid() {
        return Err(CliError::InvalidArgument(format!(
            "{} is outside the valid coordinate range",
            point
        )));
    }
    Ok(point)
}

/// One-line summary of the call state.
pub fn describe_state(state: &CallState) -> String {
    let Some(call_id) = &state.call_id else {
        return match &state.error {
            Some(error) => format!("No active call ({})", error),
            None => "No active call".to_string(),
        };
    };

    let mut line = match state.status {
        Some(status) => format!("Call {}: {}", call_id, status),
        None => format!("Call {}", call_id),
    };
    if let Some(position) = state.counterpart_position {
        line.push_str(&format!(", counterpart at {}", position));
    }
    if let Some(route) = state.current_route() {
        line.push_str(&format!(
            ", route {:.0} m / {:.0} s",
            route.distance_meters, route.duration_seconds
        ));
    }
    if let Some(hospital) = &state.selected_hospital {
        line.push_str(&format!(", hospital {}", hospital.name));
    }
    if let Some(error) = &state.error {
        line.push_str(&format!(" [{}]", error));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambulink::model::CallStatus;

    #[test]
    fn test_parse_point() {
        let point = parse_point("6.5244, 3.3792").unwrap();
        assert_eq!(point, LatLng::new(6.5244, 3.3792));
    }

    #[test]
    fn test_parse_point_rejects_bad_input() {
        assert!(parse_point("6.5").is_err());
        assert!(parse_point("north,east").is_err());
        assert!(parse_point("91.0,0.0").is_err());
    }

    #[test]
    fn test_describe_state() {
        assert_eq!(describe_state(&CallState::default()), "No active call");

        let state = CallState {
            call_id: Some("c1".to_string()),
            status: Some(CallStatus::Arrived),
            ..CallState::default()
        };
        assert!(describe_state(&state).starts_with("Call c1: "));
    }
}
