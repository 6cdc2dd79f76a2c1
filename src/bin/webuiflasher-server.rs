//! WebUIFlasher Server - browser-based ESP32 firmware flashing
//!
//! Binary entry point for the web UI server.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::fs;
use webuiflasher::server::{ServerConfig, start_server};

#[derive(Parser)]
#[command(name = "webuiflasher-server")]
#[command(about = "WebUIFlasher - flash ESP32 firmware from the browser")]
#[command(version)]
struct ServerCli {
    /// Server configuration file
    #[arg(short, long, default_value = "webuiflasher-server.toml")]
    config: PathBuf,

    /// Bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to the sources.yaml manifest
    #[arg(short, long)]
    sources: Option<PathBuf>,

    /// Baud rate used when flashing
    #[arg(long)]
    baudrate: Option<u32>,

    #[command(subcommand)]
    command: Option<ServerCommands>,
}

#[derive(Subcommand)]
enum ServerCommands {
    /// Start the server
    Start,
    /// Generate default configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    webuiflasher::logging::init_server_logging(None)?;

    let cli = ServerCli::parse();

    match cli.command {
        Some(ServerCommands::Config) => {
            println!("⚙️  Generating default configuration...");
            generate_config(&cli.config).await
        }
        Some(ServerCommands::Start) | None => {
            let config = load_config(&cli).await?;
            start_server(config).await
        }
    }
}

/// Load the TOML configuration file, then apply command line overrides
async fn load_config(cli: &ServerCli) -> Result<ServerConfig> {
    let mut config = if cli.config.exists() {
        let content = fs::read_to_string(&cli.config).await.map_err(|e| {
            anyhow::anyhow!(
                "Failed to read config file '{}': {}",
                cli.config.display(),
                e
            )
        })?;
        toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!(
                "Failed to parse config file '{}': {}",
                cli.config.display(),
                e
            )
        })?
    } else {
        ServerConfig::default()
    };

    if let Some(bind) = &cli.bind {
        config.bind_address = bind.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(sources) = &cli.sources {
        config.sources = sources.clone();
    }
    if let Some(baudrate) = cli.baudrate {
        config.baudrate = baudrate;
    }

    Ok(config)
}

/// Generate a default server configuration file
async fn generate_config(config_path: &PathBuf) -> Result<()> {
    let default_config = ServerConfig::default();

    let toml_content = toml::to_string_pretty(&default_config)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config to TOML: {}", e))?;

    fs::write(config_path, toml_content).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to write config file '{}': {}",
            config_path.display(),
            e
        )
    })?;

    println!(
        "✅ Generated default configuration file: {}",
        config_path.display()
    );
    println!("ℹ️  You can edit this file to customize server settings.");
    println!(
        "ℹ️  Use --config {} to load this configuration.",
        config_path.display()
    );

    Ok(())
}
