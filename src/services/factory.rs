//! Factory image creation and flashing
//!
//! A factory image is a single merged binary (bootloader + partition table +
//! application) produced with esptool's merge-bin and flashed at address zero.

use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

use crate::models::TerminalMessage;
use crate::services::flash_service::{ESPTOOL, ensure_tool, run_streaming, write_flash_args};
use crate::services::platformio;

/// Assemble esptool merge-bin arguments for a PlatformIO build environment
///
/// Paths are relative to the project directory; esptool runs from there.
pub fn merge_bin_args(name: &str, env_name: &str, has_boot_app0: bool) -> Vec<String> {
    let build = format!(".pio/build/{}", env_name);
    let mut args: Vec<String> = [
        "--chip",
        "esp32",
        "merge-bin",
        "-o",
        &format!("{}-factory.bin", name),
        "--flash-mode",
        "dio",
        "--flash-freq",
        "40m",
        "--flash-size",
        "4MB",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.push("0x1000".to_string());
    args.push(format!("{}/bootloader.bin", build));
    args.push("0x8000".to_string());
    args.push(format!("{}/partitions.bin", build));
    if has_boot_app0 {
        args.push("0xe000".to_string());
        args.push(format!("{}/boot_app0.bin", build));
    }
    args.push("0x10000".to_string());
    args.push(format!("{}/firmware.bin", build));

    args
}

/// Build a PlatformIO project and merge its binaries into a factory image
pub async fn create_factory_image(
    name: &str,
    project_dir: &Path,
    tx: &UnboundedSender<TerminalMessage>,
) -> Result<PathBuf> {
    ensure_tool(ESPTOOL, "pip install esptool")?;

    let _ = tx.send(TerminalMessage::info("Building factory image..."));

    if !platformio::build(project_dir, tx).await? {
        return Err(anyhow!("PlatformIO build failed"));
    }

    let build_dir = project_dir.join(".pio").join("build");
    if !build_dir.exists() {
        return Err(anyhow!("Build directory not found"));
    }

    // PlatformIO creates one directory per environment; take the first
    let env_dir = std::fs::read_dir(&build_dir)?
        .flatten()
        .map(|e| e.path())
        .find(|p| p.is_dir())
        .ok_or_else(|| anyhow!("No build environment found"))?;
    let env_name = env_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Invalid build environment path"))?;

    let _ = tx.send(TerminalMessage::info(format!(
        "Using build environment: {}",
        env_name
    )));

    for required in ["bootloader.bin", "partitions.bin", "firmware.bin"] {
        if !env_dir.join(required).exists() {
            return Err(anyhow!("Required binary file not found: {}", required));
        }
    }

    let has_boot_app0 = env_dir.join("boot_app0.bin").exists();
    let args = merge_bin_args(name, &env_name, has_boot_app0);
    let ok = run_streaming(ESPTOOL, &args, Some(project_dir), tx).await?;
    if !ok {
        return Err(anyhow!("esptool merge-bin failed"));
    }

    let factory_image = project_dir.join(format!("{}-factory.bin", name));
    if !factory_image.exists() {
        return Err(anyhow!("Factory image creation failed - file not created"));
    }

    let size_kb = std::fs::metadata(&factory_image)?.len() as f64 / 1024.0;
    let _ = tx.send(TerminalMessage::success(format!(
        "Factory image created: {:.1} KB",
        size_kb
    )));

    Ok(factory_image)
}

/// Flash a factory image at address zero with esptool
pub async fn flash_factory_image(
    image: &Path,
    port: Option<&str>,
    baudrate: u32,
    tx: &UnboundedSender<TerminalMessage>,
) -> Result<bool> {
    ensure_tool(ESPTOOL, "pip install esptool")?;

    let _ = tx.send(TerminalMessage::info("Flashing factory image..."));

    let args = write_flash_args(port, baudrate, image);
    let ok = run_streaming(ESPTOOL, &args, None, tx).await?;
    if ok {
        let _ = tx.send(TerminalMessage::success(
            "Factory image flashed successfully!",
        ));
    }
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_bin_args_with_boot_app0() {
        let args = merge_bin_args("km271", "esp32dev", true);
        assert_eq!(args[0], "--chip");
        assert_eq!(args[1], "esp32");
        assert_eq!(args[2], "merge-bin");
        assert!(args.contains(&"km271-factory.bin".to_string()));
        assert!(args.contains(&".pio/build/esp32dev/bootloader.bin".to_string()));
        assert!(args.contains(&"0xe000".to_string()));
        // Application is always last, at the app offset
        assert_eq!(args[args.len() - 2], "0x10000");
        assert_eq!(args[args.len() - 1], ".pio/build/esp32dev/firmware.bin");
    }

    #[test]
    fn test_merge_bin_args_without_boot_app0() {
        let args = merge_bin_args("km271", "esp32dev", false);
        assert!(!args.contains(&"0xe000".to_string()));
        assert!(!args.iter().any(|a| a.contains("boot_app0")));
    }
}
