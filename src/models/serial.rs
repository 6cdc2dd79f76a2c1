//! Serial port presentation model

use serde::{Deserialize, Serialize};

/// One entry in the serial port picker of the web UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialPortInfo {
    /// Device path ("/dev/ttyUSB0", "COM3") or the "auto" pseudo-port
    pub device: String,
    pub description: String,
    pub hwid: String,
}

impl SerialPortInfo {
    /// The auto-detect pseudo-entry that always heads the port list
    pub fn auto() -> Self {
        Self {
            device: "auto".to_string(),
            description: "Auto-detect".to_string(),
            hwid: "Automatic detection".to_string(),
        }
    }
}
