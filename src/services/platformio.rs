//! PlatformIO invocation helpers

use anyhow::Result;
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;

use crate::models::TerminalMessage;
use crate::services::flash_service::{ensure_tool, run_streaming};

/// Name of the PlatformIO executable
pub const PIO: &str = "pio";

/// Assemble PlatformIO upload arguments
pub fn upload_args(port: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--target".to_string(),
        "upload".to_string(),
    ];
    if let Some(port) = port {
        args.push("--upload-port".to_string());
        args.push(port.to_string());
    }
    args
}

/// Build a PlatformIO project (`pio run`)
pub async fn build(project_dir: &Path, tx: &UnboundedSender<TerminalMessage>) -> Result<bool> {
    ensure_tool(PIO, "pip install platformio")?;
    run_streaming(PIO, &["run".to_string()], Some(project_dir), tx).await
}

/// Fallback: flash by direct PlatformIO upload
pub async fn upload(
    port: Option<&str>,
    project_dir: &Path,
    tx: &UnboundedSender<TerminalMessage>,
) -> Result<bool> {
    ensure_tool(PIO, "pip install platformio")?;

    let _ = tx.send(TerminalMessage::info("Using direct PlatformIO upload..."));

    let ok = run_streaming(PIO, &upload_args(port), Some(project_dir), tx).await?;
    if ok {
        let _ = tx.send(TerminalMessage::success("Upload successful!"));
    }
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_args_with_port() {
        assert_eq!(
            upload_args(Some("/dev/ttyUSB0")),
            vec!["run", "--target", "upload", "--upload-port", "/dev/ttyUSB0"]
        );
    }

    #[test]
    fn test_upload_args_auto() {
        assert_eq!(upload_args(None), vec!["run", "--target", "upload"]);
    }
}
