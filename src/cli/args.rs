//! Command line argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, long_about = None)]
#[command(name = "webuiflasher")]
#[command(about = "⚡ ESP32 Firmware Flash Tool - flashes firmware named in a sources.yaml manifest via esptool or PlatformIO")]
pub struct Cli {
    /// Name of the firmware to flash (from sources.yaml)
    #[arg(value_name = "NAME")]
    pub name: Option<String>,

    /// Serial port (esptool auto-detects when omitted)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Path to the sources.yaml manifest
    #[arg(short, long, default_value = "sources.yaml")]
    pub sources: PathBuf,

    /// Baud rate for flashing
    #[arg(short, long, default_value_t = 921600)]
    pub baudrate: u32,

    /// Continue flashing after each device (for batch production)
    #[arg(short = 'l', long = "loop")]
    pub loop_mode: bool,

    /// List available firmware names
    #[arg(long)]
    pub list: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Decrease logging verbosity (only errors)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// List available firmware from the manifest
    List,
    /// Download/refresh firmware binaries from their GitHub releases
    Update {
        /// Re-download even when the release tag is unchanged
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
