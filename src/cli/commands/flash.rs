//! Flash firmware to a device, optionally looping for batch production

use anyhow::{Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::IsTerminal;

use crate::cli::args::Cli;
use crate::cli::commands::spawn_printer;
use crate::config::SourcesConfig;
use crate::services::FlashService;

pub async fn execute_flash_command(cli: &Cli, name: &str) -> Result<()> {
    let config = SourcesConfig::load(&cli.sources)?;
    let service = FlashService::new(config);

    if cli.loop_mode {
        flash_batch(cli, name, &service).await
    } else {
        let success = flash_once(cli, name, &service).await?;
        if success {
            Ok(())
        } else {
            Err(anyhow!("Flashing '{}' failed", name))
        }
    }
}

async fn flash_once(cli: &Cli, name: &str, service: &FlashService) -> Result<bool> {
    let (tx, printer) = spawn_printer();
    let result = service
        .flash_firmware(name, cli.port.as_deref(), cli.baudrate, &tx)
        .await;
    drop(tx);
    let _ = printer.await;
    result
}

/// Batch production mode: flash, wait for the next device, repeat
async fn flash_batch(cli: &Cli, name: &str, service: &FlashService) -> Result<()> {
    println!("🏭 Batch Production Mode Enabled");
    println!("{}", "━".repeat(60));
    println!("📦 Firmware: {}", name);
    println!("⚡ Baudrate: {}", cli.baudrate);
    match &cli.port {
        Some(port) => println!("🔗 Port: {}", port),
        None => println!("🔗 Port: Auto-detect"),
    }
    println!("{}", "━".repeat(60));

    let mut device_count = 0u32;

    loop {
        device_count += 1;
        println!("\n🔢 Device #{}", device_count);

        match flash_once(cli, name, service).await {
            Ok(true) => println!("✅ Device #{} flashed successfully!", device_count),
            Ok(false) => {
                println!("❌ Device #{} failed to flash!", device_count);
                println!("💡 Check connection and try again");
            }
            Err(e) => {
                println!("❌ Device #{} failed to flash: {}", device_count, e);
                println!("💡 Check connection and try again");
            }
        }

        if !wait_for_next_device().await? {
            break;
        }
    }

    println!(
        "\n📊 Batch production completed: {} device(s) processed",
        device_count
    );
    Ok(())
}

/// Wait for a key press between devices, returning whether to continue
async fn wait_for_next_device() -> Result<bool> {
    println!("\n{}", "━".repeat(60));
    println!("🔄 Batch Production Mode");
    println!("{}", "━".repeat(60));
    println!("📱 Connect next device and press any key to continue...");
    println!("🛑 Press 'ESC' or 'n' to stop");
    println!("{}", "━".repeat(60));

    if std::io::stdin().is_terminal() {
        // Key reads block, keep them off the async runtime
        tokio::task::spawn_blocking(read_continue_key).await?
    } else {
        read_continue_line()
    }
}

fn read_continue_key() -> Result<bool> {
    enable_raw_mode()?;
    // Raw mode must be left even when the key read fails, or the user's
    // terminal stays broken after exit
    let decision = read_key_decision();
    disable_raw_mode()?;
    let decision = decision?;

    if decision {
        println!("🚀 Continuing with next device...");
    } else {
        println!("🛑 Stopping batch production...");
    }
    Ok(decision)
}

fn read_key_decision() -> Result<bool> {
    loop {
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                return Ok(continue_on_key(key.code));
            }
            _ => continue,
        }
    }
}

/// Esc and 'n'/'N' stop the batch; any other key continues
fn continue_on_key(code: KeyCode) -> bool {
    !matches!(code, KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N'))
}

/// Fallback when stdin is not a terminal
fn read_continue_line() -> Result<bool> {
    println!("Press ENTER to continue or 'n' to stop:");
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line)? == 0 {
        println!("🛑 Stopping batch production...");
        return Ok(false);
    }
    if line.trim().eq_ignore_ascii_case("n") {
        println!("🛑 Stopping batch production...");
        Ok(false)
    } else {
        println!("🚀 Continuing with next device...");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_keys_end_the_batch() {
        assert!(!continue_on_key(KeyCode::Esc));
        assert!(!continue_on_key(KeyCode::Char('n')));
        assert!(!continue_on_key(KeyCode::Char('N')));
    }

    #[test]
    fn test_any_other_key_continues() {
        assert!(continue_on_key(KeyCode::Enter));
        assert!(continue_on_key(KeyCode::Char(' ')));
        assert!(continue_on_key(KeyCode::Char('y')));
    }
}
