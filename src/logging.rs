//! Logging initialization

use anyhow::Result;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::Write;

/// Initialize logging for the CLI
pub fn init_cli_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };

    Builder::from_default_env()
        .target(Target::Stderr)
        .filter_level(level)
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    log::debug!("webuiflasher logging initialized with level: {:?}", level);
    Ok(())
}

/// Initialize logging for the web server
pub fn init_server_logging(level: Option<LevelFilter>) -> Result<()> {
    let level = level.unwrap_or(LevelFilter::Info);

    Builder::from_default_env()
        .target(Target::Stdout)
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                buf.timestamp(),
                record.level(),
                record.args()
            )
        })
        .init();

    log_panics::init();

    log::info!("webuiflasher server logging initialized with level: {:?}", level);
    Ok(())
}
