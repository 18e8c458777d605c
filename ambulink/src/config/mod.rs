//! Configuration for the real-time layer.
//!
//! User settings live in `~/.ambulink/config.ini`:
//!
//! - [`settings`] - one struct per `[section]`
//! - [`defaults`] - `DEFAULT_*` constants and `ConfigFile::default()`
//! - parsing and writing are private to this module
//!
//! # Example
//!
//! ```
//! use ambulink::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let channel = config.channel_config();
//! assert_eq!(channel.connect_timeout.as_secs(), 10);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    AuthSettings, ChannelSettings, ConfigFile, LocationSettings, LoggingSettings, ServerSettings,
};
