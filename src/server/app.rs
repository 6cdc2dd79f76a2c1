//! Server application implementation

use anyhow::Result;
use log::info;
use std::sync::Arc;
use warp::Filter;

use super::ServerConfig;
use crate::config::SourcesConfig;
use crate::errors::Result as FlasherResult;

/// Shared server state
///
/// The manifest is reloaded from disk for every request so edits to
/// sources.yaml take effect without a restart.
#[derive(Debug)]
pub struct ServerState {
    pub config: ServerConfig,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Load the current manifest from disk
    pub fn load_sources(&self) -> FlasherResult<SourcesConfig> {
        SourcesConfig::load(&self.config.sources)
    }
}

/// Server application main struct
pub struct ServerApp {
    config: ServerConfig,
    state: Arc<ServerState>,
}

impl ServerApp {
    pub fn new(config: ServerConfig) -> Self {
        let state = Arc::new(ServerState::new(config.clone()));
        Self { config, state }
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        println!("🚀 Starting ESP32 Firmware Flash Web Tool...");
        println!(
            "📍 Open your browser to: http://{}:{}",
            self.config.bind_address, self.config.port
        );
        println!("📡 API endpoints:");
        println!("   GET  /api/firmware        - List available firmware");
        println!("   GET  /api/firmware/{{name}} - Firmware details");
        println!("   GET  /api/serial-ports    - List serial ports");
        println!("   POST /api/flash           - Flash a firmware");
        println!("   POST /api/update-firmware - Refresh downloaded firmware");
        println!("   WS   /ws/terminal         - Live terminal");
        println!("   GET  /health              - Health check");
        println!("💡 Press Ctrl+C to stop");

        let routes = super::routes::create_routes(self.state.clone())
            .with(warp::cors().allow_any_origin())
            .with(warp::log("webuiflasher-server"));

        let addr: std::net::IpAddr = self
            .config
            .bind_address
            .parse()
            .unwrap_or_else(|_| std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));

        let (bound, server_fut) = warp::serve(routes)
            .bind_with_graceful_shutdown((addr, self.config.port), async move {
                shutdown_signal().await;
                println!("\n🛑 Shutdown signal received. Stopping HTTP server...");
            });

        info!("Server listening on {}", bound);
        server_fut.await;
        println!("✅ Server stopped cleanly");

        Ok(())
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate()).expect("create SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
