//! Web UI server module
//!
//! Serves the browser flashing UI: a JSON API over the firmware manifest and
//! the serial ports, a flash endpoint, and a WebSocket terminal that streams
//! live subprocess output.

pub mod app;
pub mod routes;
pub mod services;

pub use app::*;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server listening address
    pub bind_address: String,
    /// Server listening port
    pub port: u16,
    /// Path to the sources.yaml manifest
    pub sources: PathBuf,
    /// Baud rate used for flashing from the web UI
    pub baudrate: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            sources: PathBuf::from("sources.yaml"),
            baudrate: 921600,
        }
    }
}

/// Start the web UI server
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let app = ServerApp::new(config);
    app.run().await
}
