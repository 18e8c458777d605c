//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [server] section
    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = section.get("primary_url") {
            config.server.primary_url = parse_url("primary_url", v)?;
        }
        if let Some(v) = section.get("fallback_url") {
            config.server.fallback_url = if v.trim().is_empty() {
                None
            } else {
                Some(parse_url("fallback_url", v)?)
            };
        }
    }

    // [channel] section
    if let Some(section) = ini.section(Some("channel")) {
        let channel = &mut config.channel;
        if let Some(v) = positive(section, "channel", "connect_timeout_secs", "seconds")? {
            channel.connect_timeout_secs = v;
        }
        if let Some(v) = positive(section, "channel", "backoff_initial_ms", "milliseconds")? {
            channel.backoff_initial_ms = v;
        }
        if let Some(v) = positive(section, "channel", "backoff_max_ms", "milliseconds")? {
            channel.backoff_max_ms = v;
        }
        if let Some(v) = positive(section, "channel", "watchdog_interval_ms", "milliseconds")? {
            channel.watchdog_interval_ms = v;
        }
        if let Some(v) = positive(section, "channel", "event_buffer", "events")? {
            channel.event_buffer = v;
        }
        if channel.backoff_max_ms < channel.backoff_initial_ms {
            return Err(ConfigFileError::InvalidValue {
                section: "channel".to_string(),
                key: "backoff_max_ms".to_string(),
                value: channel.backoff_max_ms.to_string(),
                reason: "must not be smaller than backoff_initial_ms".to_string(),
            });
        }
    }

    // [location] section
    if let Some(section) = ini.section(Some("location")) {
        if let Some(v) = positive(section, "location", "broadcast_interval_ms", "milliseconds")? {
            config.location.broadcast_interval_ms = v;
        }
    }

    // [auth] section
    if let Some(section) = ini.section(Some("auth")) {
        if let Some(v) = section.get("login_path") {
            config.auth.login_path = parse_path("login_path", v)?;
        }
        if let Some(v) = section.get("verify_path") {
            config.auth.verify_path = parse_path("verify_path", v)?;
        }
        if let Some(v) = section.get("refresh_path") {
            config.auth.refresh_path = parse_path("refresh_path", v)?;
        }
        if let Some(v) = positive(section, "auth", "request_timeout_secs", "seconds")? {
            config.auth.request_timeout_secs = v;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Parse a strictly positive integer key.
fn positive<T>(
    section: &Properties,
    section_name: &str,
    key: &str,
    unit: &str,
) -> Result<Option<T>, ConfigFileError>
where
    T: FromStr + Default + PartialOrd,
{
    let Some(v) = section.get(key) else {
        return Ok(None);
    };
    match v.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(Some(parsed)),
        _ => Err(ConfigFileError::InvalidValue {
            section: section_name.to_string(),
            key: key.to_string(),
            value: v.to_string(),
            reason: format!("must be a positive integer ({})", unit),
        }),
    }
}

fn parse_url(key: &str, value: &str) -> Result<String, ConfigFileError> {
    let v = value.trim();
    let valid = ["http://", "https://", "ws://", "wss://"]
        .iter()
        .any(|scheme| v.starts_with(scheme) && v.len() > scheme.len());
    if !valid {
        return Err(ConfigFileError::InvalidValue {
            section: "server".to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be an http(s) or ws(s) URL".to_string(),
        });
    }
    Ok(v.trim_end_matches('/').to_string())
}

fn parse_path(key: &str, value: &str) -> Result<String, ConfigFileError> {
    let v = value.trim();
    if !v.starts_with('/') {
        return Err(ConfigFileError::InvalidValue {
            section: "auth".to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must start with '/'".to_string(),
        });
    }
    Ok(v.to_string())
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
