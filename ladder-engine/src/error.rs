//! Error types for the session controller

use thiserror::Error;

use crate::session::SessionState;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while bringing a tunnel session up or reading its telemetry
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed bootstrap response or counter line
    #[error("parse error: {0}")]
    Parse(String),

    /// The user or platform refused permission to run a tunnel
    #[error("tunnel consent was not granted")]
    ConsentDenied,

    /// The platform refused to establish the virtual interface
    #[error("failed to establish interface: {0}")]
    Establish(#[from] ladder_tun::Error),

    /// The tunnel engine failed to open a session
    #[error("engine error: {0}")]
    Engine(String),

    /// A stop arrived while the session was being established
    #[error("session start cancelled by stop")]
    Cancelled,

    /// Another start or stop is still in flight
    #[error("session is busy ({0})")]
    Busy(SessionState),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to parse configuration file
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error aborts the current start attempt
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Parse(_) | Error::ConsentDenied | Error::Establish(_) | Error::Engine(_)
        )
    }
}
