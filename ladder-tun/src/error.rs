//! Error types for ladder-tun

use std::io;
use thiserror::Error;

/// Result type alias for ladder-tun operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while describing or establishing a virtual interface
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from underlying system calls
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The platform refused to create the interface
    #[error("interface establishment denied: {0}")]
    Denied(String),

    /// Invalid network prefix
    #[error("invalid network prefix: {0}")]
    InvalidPrefix(String),
}
