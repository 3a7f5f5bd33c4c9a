//! # Error Types
//!
//! Custom error types for the x-BIMU logger using `thiserror`.

use thiserror::Error;

/// Main error type for the x-BIMU logger
#[derive(Debug, Error)]
pub enum XbimuError {
    /// Serial port open/read/write failures
    #[error("Serial error: {0}")]
    Serial(String),

    /// No responding device found on any probed port
    #[error("No x-BIMU transceiver found on: {0}")]
    DeviceNotFound(String),

    /// The transceiver never reported a radio channel during the handshake
    #[error("Device did not report a radio channel during the handshake")]
    NoChannelDiscovered,

    /// Operation requires a connected session
    #[error("Not connected to a device")]
    NotConnected,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the x-BIMU logger
pub type Result<T> = std::result::Result<T, XbimuError>;
