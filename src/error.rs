//! # Error Types
//!
//! Custom error types for the RC RF bridge using `thiserror`.

use thiserror::Error;

/// Main error type for the bridge runtime
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial ports could be opened
    #[error("No serial port found (tried: {0})")]
    SerialPortNotFound(String),

    /// Malformed host link frames
    #[error("Host link error: {0}")]
    HostLink(String),

    /// Telemetry logger errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons a host command is answered with a negative acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    #[error("invalid payload for opcode {opcode}: expected {expected} bytes, got {actual}")]
    InvalidPayload {
        opcode: u8,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported module {module} / protocol {protocol}")]
    UnsupportedProtocol { module: u8, protocol: u8 },

    #[error("no RF protocol selected")]
    NoProtocolSelected,

    #[error("RF protocol is not running")]
    NotRunning,

    #[error("unsupported info field {0}")]
    UnsupportedInfoField(u8),

    #[error("link error: {0}")]
    Link(#[from] LinkError),
}

/// Failures of the RF protocol lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("radio transceiver did not come back from reset")]
    RadioReset,
}

/// Result type alias for the bridge runtime
pub type Result<T> = std::result::Result<T, BridgeError>;
