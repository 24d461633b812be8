//! Error types for Ome.

use thiserror::Error;

/// Main error type for Ome operations.
#[derive(Error, Debug)]
pub enum OmeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Output device error: {0}")]
    Device(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Ome operations.
pub type Result<T> = std::result::Result<T, OmeError>;
