//! Terminal message protocol for the WebSocket terminal
//!
//! Every event sent to a browser terminal is a `{type, message, timestamp}`
//! JSON object. The same messages drive CLI output, where only the text and
//! category matter.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Category of a terminal event, used by the browser to style and place lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Informational status line
    Info,
    /// Echo of a command about to be executed
    Command,
    /// Incomplete line, terminal may append in place
    Partial,
    /// Progress line, terminal overwrites the previous progress line
    Progress,
    /// Plain subprocess output
    Output,
    /// Completed successfully
    Success,
    /// Failure of any kind
    Error,
    /// Line read from a serial monitor
    Monitor,
    /// Reply to a ping command
    Pong,
}

/// A single event on the WebSocket terminal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub message: String,
    pub timestamp: String,
}

impl TerminalMessage {
    pub fn new(kind: MessageKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Local::now().to_rfc3339(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(MessageKind::Info, message)
    }

    pub fn command(message: impl Into<String>) -> Self {
        Self::new(MessageKind::Command, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(MessageKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, message)
    }
}

/// Commands a browser terminal may send over the WebSocket
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerminalCommand {
    /// Flash a named firmware from the manifest
    Flash {
        firmware: String,
        #[serde(default = "default_port")]
        port: String,
    },
    /// Run an arbitrary esptool invocation with live output
    Esptool { command: String },
    /// Refresh downloaded firmware binaries
    UpdateFirmware,
    /// Start a serial monitor on a port
    Monitor {
        port: String,
        #[serde(default = "default_monitor_baudrate")]
        baudrate: u32,
    },
    /// Stop the serial monitor on a port
    StopMonitor { port: String },
    /// Connection liveness check
    Ping,
}

fn default_port() -> String {
    "auto".to_string()
}

fn default_monitor_baudrate() -> u32 {
    115200
}
