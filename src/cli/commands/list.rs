//! List available firmware from the manifest

use anyhow::Result;

use crate::cli::args::Cli;
use crate::config::{SourceType, SourcesConfig};
use crate::models::FirmwareInfo;

pub fn execute_list_command(cli: &Cli) -> Result<()> {
    let config = SourcesConfig::load(&cli.sources)?;

    println!("📋 Available firmware:");
    println!("{}", "━".repeat(50));

    for source in &config.sources {
        let info = FirmwareInfo::from_source(source, &config);
        let status = if info.available { "✅" } else { "❌" };
        println!(
            "{} {} ({}, {})",
            status, info.name, info.source_type, info.platform
        );

        match source.source_type {
            SourceType::Github => {
                println!("    📦 {} - {}", info.description, info.version);
            }
            SourceType::Local => {
                println!("    📁 {}", info.description);
            }
        }
    }

    println!();
    println!("💡 Use 'webuiflasher update' to download missing firmware");
    Ok(())
}
