//! Custom error types for WebUIFlasher

use std::fmt;

/// Main error type for WebUIFlasher operations
#[derive(Debug)]
pub enum FlasherError {
    /// Manifest (sources.yaml) related errors
    Manifest(String),
    /// Firmware lookup/availability errors
    Firmware(String),
    /// Flash operation errors
    Flash(String),
    /// Serial port / monitor errors
    Serial(String),
    /// Firmware download errors
    Download(String),
    /// External tool errors (esptool, pio not found or failed)
    Tool(String),
    /// GPIO control errors
    Gpio(String),
    /// General I/O errors
    Io(std::io::Error),
    /// Serialization errors
    Serialization(String),
}

impl fmt::Display for FlasherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlasherError::Manifest(msg) => write!(f, "Manifest error: {}", msg),
            FlasherError::Firmware(msg) => write!(f, "Firmware error: {}", msg),
            FlasherError::Flash(msg) => write!(f, "Flash error: {}", msg),
            FlasherError::Serial(msg) => write!(f, "Serial port error: {}", msg),
            FlasherError::Download(msg) => write!(f, "Download error: {}", msg),
            FlasherError::Tool(msg) => write!(f, "Tool error: {}", msg),
            FlasherError::Gpio(msg) => write!(f, "GPIO error: {}", msg),
            FlasherError::Io(err) => write!(f, "I/O error: {}", err),
            FlasherError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for FlasherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlasherError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FlasherError {
    fn from(err: std::io::Error) -> Self {
        FlasherError::Io(err)
    }
}

impl From<serde_json::Error> for FlasherError {
    fn from(err: serde_json::Error) -> Self {
        FlasherError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for FlasherError {
    fn from(err: serde_yaml::Error) -> Self {
        FlasherError::Serialization(err.to_string())
    }
}

/// Result type alias for WebUIFlasher operations
pub type Result<T> = std::result::Result<T, FlasherError>;
