//! # Error Types
//!
//! Custom error types for Gyropad Bridge using `thiserror`.

use thiserror::Error;

use crate::session::SessionId;

/// Main error type for Gyropad Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration file errors (parse or validation)
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// A single axis mapping entry was rejected
    #[error("Invalid axis mapping '{entry}': {reason}")]
    InvalidAxisConfig {
        /// Output axis (or source) the offending entry refers to
        entry: String,
        /// Why the entry was rejected
        reason: String,
    },

    /// Reconfiguration tried to change the controller shape at runtime
    #[error("Topology change from {active} to {requested} requires a restart")]
    TopologyMismatch { active: String, requested: String },

    /// The platform device-emulation facility could not be opened
    #[error("Virtual device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A write to the virtual device failed
    #[error("Virtual device error: {0}")]
    Device(String),

    /// Operation referenced a session that is not connected
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    /// The engine thread is no longer accepting commands
    #[error("Engine stopped")]
    EngineStopped,

    /// Malformed session protocol message
    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Gyropad Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
