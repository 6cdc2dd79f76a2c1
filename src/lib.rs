//! WebUIFlasher - ESP32 Firmware Flash Tool
//!
//! WebUIFlasher is a convenience layer around esptool and PlatformIO: it looks
//! up named firmware binaries in a YAML manifest (`sources.yaml`), flashes them
//! to ESP32 devices from the command line or from a browser-based web UI, and
//! streams the flashing tool's output live over a WebSocket terminal.

pub mod cli;
pub mod config;
pub mod errors;
pub mod gpio;
pub mod logging;
pub mod models;
pub mod output;
pub mod serial;
pub mod server;
pub mod services;

// Re-export commonly used types
pub use errors::*;
pub use models::*;

/// WebUIFlasher version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WebUIFlasher application name
pub const APP_NAME: &str = "webuiflasher";
