//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;
use std::time::Duration;

use crate::api::AuthPaths;
use crate::channel::{ChannelConfig, HostSelector};
use crate::driver::DriverConfig;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub server: ServerSettings,
    pub channel: ChannelSettings,
    pub location: LocationSettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

/// Dispatch server hosts.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    /// Base URL of the dispatch server (HTTP API and channels)
    pub primary_url: String,
    /// Alternate host used once after the primary is unreachable
    pub fallback_url: Option<String>,
}

/// Channel lifecycle timing.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSettings {
    /// Connect attempts longer than this are discarded by the watchdog
    pub connect_timeout_secs: u64,
    /// First reconnect delay
    pub backoff_initial_ms: u64,
    /// Reconnect delay cap
    pub backoff_max_ms: u64,
    /// Watchdog check period
    pub watchdog_interval_ms: u64,
    /// Inbound event queue depth per role
    pub event_buffer: usize,
}

/// Driver position broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSettings {
    pub broadcast_interval_ms: u64,
}

/// Authentication endpoints and HTTP timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSettings {
    pub login_path: String,
    pub verify_path: String,
    pub refresh_path: String,
    pub request_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

impl ConfigFile {
    pub fn hosts(&self) -> HostSelector {
        HostSelector::new(
            self.server.primary_url.clone(),
            self.server.fallback_url.clone(),
        )
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            connect_timeout: Duration::from_secs(self.channel.connect_timeout_secs),
            backoff_initial: Duration::from_millis(self.channel.backoff_initial_ms),
            backoff_max: Duration::from_millis(self.channel.backoff_max_ms),
            watchdog_interval: Duration::from_millis(self.channel.watchdog_interval_ms),
            event_buffer: self.channel.event_buffer,
            ..ChannelConfig::default()
        }
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            broadcast_interval: Duration::from_millis(self.location.broadcast_interval_ms),
        }
    }

    pub fn auth_paths(&self) -> AuthPaths {
        AuthPaths {
            login: self.auth.login_path.clone(),
            verify: self.auth.verify_path.clone(),
            refresh: self.auth.refresh_path.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.auth.request_timeout_secs)
    }
}
