//! Command Line Interface module

pub mod args;
pub mod commands;

pub use args::*;

use anyhow::Result;

/// Main CLI application runner
pub async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    crate::logging::init_cli_logging(cli.verbose, cli.quiet)?;

    match &cli.command {
        Some(Commands::List) => commands::list::execute_list_command(&cli),
        Some(Commands::Update { force }) => {
            commands::update::execute_update_command(&cli, *force).await
        }
        None => match cli.name.clone() {
            // Listing is the default when no firmware name is given
            Some(name) if !cli.list => commands::flash::execute_flash_command(&cli, &name).await,
            _ => commands::list::execute_list_command(&cli),
        },
    }
}
