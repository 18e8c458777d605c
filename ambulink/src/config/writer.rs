//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let fallback_url = config.server.fallback_url.as_deref().unwrap_or("");

    format!(
        r#"[server]
; Base URL of the dispatch server, used for the HTTP API and both channels.
; http(s) is mapped to ws(s) for the channel connection.
primary_url = {}
; Alternate host tried once after the primary is unreachable. Leave empty to disable.
fallback_url = {}

[channel]
; A connect attempt running longer than this is discarded and retried (seconds)
connect_timeout_secs = {}
; Reconnect delay doubles from backoff_initial_ms up to backoff_max_ms
backoff_initial_ms = {}
backoff_max_ms = {}
; How often the connection watchdog checks the channel (milliseconds)
watchdog_interval_ms = {}
; Inbound event queue depth per role
event_buffer = {}

[location]
; Driver position broadcast period while serving a call (milliseconds)
broadcast_interval_ms = {}

[auth]
login_path = {}
verify_path = {}
refresh_path = {}
; HTTP request timeout (seconds)
request_timeout_secs = {}

[logging]
; Log file path
file = {}
"#,
        config.server.primary_url,
        fallback_url,
        config.channel.connect_timeout_secs,
        config.channel.backoff_initial_ms,
        config.channel.backoff_max_ms,
        config.channel.watchdog_interval_ms,
        config.channel.event_buffer,
        config.location.broadcast_interval_ms,
        config.auth.login_path,
        config.auth.verify_path,
        config.auth.refresh_path,
        config.auth.request_timeout_secs,
        path_to_string(&config.logging.file),
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_every_section() {
        let text = to_config_string(&ConfigFile::default());
        for section in ["[server]", "[channel]", "[location]", "[auth]", "[logging]"] {
            assert!(text.contains(section), "missing {}", section);
        }
        assert!(text.contains("fallback_url = http://localhost:3000"));
    }

    #[test]
    fn test_empty_fallback() {
        let mut config = ConfigFile::default();
        config.server.fallback_url = None;
        let text = to_config_string(&config);
        assert!(text.contains("fallback_url = \n"));
    }
}
