//! Default values for all configuration settings.

use super::file::config_directory;
use super::settings::*;

pub const DEFAULT_PRIMARY_URL: &str = "https://api.ambulink.app";
pub const DEFAULT_FALLBACK_URL: &str = "http://localhost:3000";

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BACKOFF_INITIAL_MS: u64 = 1_000;
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 5_000;
pub const DEFAULT_WATCHDOG_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_EVENT_BUFFER: usize = 64;

pub const DEFAULT_BROADCAST_INTERVAL_MS: u64 = 2_000;

pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_VERIFY_PATH: &str = "/auth/verify";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

pub const DEFAULT_LOG_FILE: &str = "ambulink.log";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                primary_url: DEFAULT_PRIMARY_URL.to_string(),
                fallback_url: Some(DEFAULT_FALLBACK_URL.to_string()),
            },
            channel: ChannelSettings {
                connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
                backoff_initial_ms: DEFAULT_BACKOFF_INITIAL_MS,
                backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
                watchdog_interval_ms: DEFAULT_WATCHDOG_INTERVAL_MS,
                event_buffer: DEFAULT_EVENT_BUFFER,
            },
            location: LocationSettings {
                broadcast_interval_ms: DEFAULT_BROADCAST_INTERVAL_MS,
            },
            auth: AuthSettings {
                login_path: DEFAULT_LOGIN_PATH.to_string(),
                verify_path: DEFAULT_VERIFY_PATH.to_string(),
                refresh_path: DEFAULT_REFRESH_PATH.to_string(),
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            },
            logging: LoggingSettings {
                file: config_directory().join("logs").join(DEFAULT_LOG_FILE),
            },
        }
    }
}
