//! Download/refresh firmware binaries

use anyhow::{Result, anyhow};

use crate::cli::args::Cli;
use crate::cli::commands::spawn_printer;
use crate::config::SourcesConfig;
use crate::services::UpdateService;

pub async fn execute_update_command(cli: &Cli, force: bool) -> Result<()> {
    let config = SourcesConfig::load(&cli.sources)?;

    println!("🚀 Firmware Downloader");
    println!("📁 Sources file: {}", cli.sources.display());
    println!("📂 Fetch directory: {}", config.fetchdir.display());

    let (tx, printer) = spawn_printer();
    let service = UpdateService::new();
    let summary = service.update_all(&config, force, &tx).await;
    drop(tx);
    let _ = printer.await;

    let summary = summary?;
    if summary.failed > 0 {
        Err(anyhow!("{} firmware download(s) failed", summary.failed))
    } else {
        Ok(())
    }
}
