//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use ambulink::api::ApiError;
use ambulink::config::ConfigFileError;
use ambulink::polyline::PolylineError;
use ambulink::session::SessionError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// A command-line value could not be used
    InvalidArgument(String),
    /// HTTP stack could not be built or a request failed
    Api(ApiError),
    /// No usable session
    Session(SessionError),
    /// Polyline could not be decoded
    Polyline(PolylineError),
}

impl CliError {
    /// Exit the process with an error message and a non-zero code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Session(_) = self {
            eprintln!();
            eprintln!("Pass --access-token and --refresh-token from a logged-in session.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Api(e) => write!(f, "Dispatch API error: {}", e),
            CliError::Session(e) => write!(f, "Session error: {}", e),
            CliError::Polyline(e) => write!(f, "Polyline error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Api(e) => Some(e),
            CliError::Session(e) => Some(e),
            CliError::Polyline(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ApiError> for CliError {
    fn from(e: ApiError) -> Self {
        CliError::Api(e)
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}

impl From<PolylineError> for CliError {
    fn from(e: PolylineError) -> Self {
        CliError::Polyline(e)
    }
}
