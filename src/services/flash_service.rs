//! Unified flash service
//!
//! Dispatches a named firmware to the right external tool: esptool for
//! downloaded factory images, PlatformIO (with an esptool merge step) for
//! local projects. Progress is reported through a terminal message channel
//! consumed by the CLI printer or a WebSocket connection.

use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::{SourceType, SourcesConfig};
use crate::gpio::FlashGpio;
use crate::models::{MessageKind, TerminalMessage};
use crate::output::{OutputChunker, OutputEvent};
use crate::services::{factory, platformio};

/// Name of the esptool executable
pub const ESPTOOL: &str = "esptool";

/// Assemble esptool arguments for flashing a factory image at address zero
pub fn write_flash_args(port: Option<&str>, baudrate: u32, image: &Path) -> Vec<String> {
    let mut args = vec!["--baud".to_string(), baudrate.to_string()];
    if let Some(port) = port {
        args.push("--port".to_string());
        args.push(port.to_string());
    }
    args.push("write-flash".to_string());
    // Factory images carry bootloader + partition table + app, flashed at 0x0
    args.push("0x0".to_string());
    args.push(image.display().to_string());
    args
}

/// Flash service over a loaded manifest
pub struct FlashService {
    config: SourcesConfig,
}

impl FlashService {
    pub fn new(config: SourcesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SourcesConfig {
        &self.config
    }

    /// Flash a named firmware to a device
    ///
    /// Returns Ok(true) when the flashing tool exited successfully.
    pub async fn flash_firmware(
        &self,
        name: &str,
        port: Option<&str>,
        baudrate: u32,
        tx: &UnboundedSender<TerminalMessage>,
    ) -> Result<bool> {
        let source = self.config.find_source(name).ok_or_else(|| {
            anyhow!(
                "Firmware '{}' not found in configuration, use 'list' to see available firmware",
                name
            )
        })?;

        match source.source_type {
            SourceType::Local => self.flash_local_project(name, port, baudrate, tx).await,
            SourceType::Github => self.flash_binary_file(name, port, baudrate, tx).await,
        }
    }

    /// Flash a downloaded factory image with esptool
    async fn flash_binary_file(
        &self,
        name: &str,
        port: Option<&str>,
        baudrate: u32,
        tx: &UnboundedSender<TerminalMessage>,
    ) -> Result<bool> {
        let firmware_path = self.config.firmware_path(name);
        if !firmware_path.exists() {
            return Err(anyhow!(
                "Firmware file not found: {}, run 'webuiflasher update' to download it",
                firmware_path.display()
            ));
        }

        ensure_tool(ESPTOOL, "pip install esptool")?;

        let _ = tx.send(TerminalMessage::info(format!(
            "Flashing {} ({})",
            name,
            firmware_path.display()
        )));

        let gpio = FlashGpio::new(self.config.gpio.clone());
        gpio.enter_flash_mode(tx).await;

        let args = write_flash_args(port, baudrate, &firmware_path);
        let status = run_streaming(ESPTOOL, &args, None, tx).await?;

        gpio.exit_flash_mode(tx).await;

        if status {
            let _ = tx.send(TerminalMessage::success(format!(
                "{} flashed successfully!",
                name
            )));
        }
        Ok(status)
    }

    /// Flash a local PlatformIO project
    ///
    /// Prefers an already-downloaded factory image, then a freshly merged one,
    /// and falls back to a direct PlatformIO upload.
    async fn flash_local_project(
        &self,
        name: &str,
        port: Option<&str>,
        baudrate: u32,
        tx: &UnboundedSender<TerminalMessage>,
    ) -> Result<bool> {
        let source = self
            .config
            .find_source(name)
            .ok_or_else(|| anyhow!("Firmware '{}' not found in configuration", name))?;
        let project_dir = source
            .path
            .clone()
            .ok_or_else(|| anyhow!("No project path specified for '{}'", name))?;

        if !project_dir.exists() {
            return Err(anyhow!(
                "Project directory not found: {}",
                project_dir.display()
            ));
        }

        let downloaded = self.config.firmware_path(name);
        if downloaded.exists() {
            let size_kb = std::fs::metadata(&downloaded)
                .map(|m| m.len() as f64 / 1024.0)
                .unwrap_or(0.0);
            let _ = tx.send(TerminalMessage::info(format!(
                "Using downloaded factory image: {} ({:.1} KB)",
                downloaded.display(),
                size_kb
            )));
            return factory::flash_factory_image(&downloaded, port, baudrate, tx).await;
        }

        let _ = tx.send(TerminalMessage::info(
            "No downloaded factory image found, creating from source...",
        ));

        match factory::create_factory_image(name, &project_dir, tx).await {
            Ok(image) => {
                let _ = tx.send(TerminalMessage::info(format!(
                    "Created factory image: {}",
                    image.display()
                )));
                factory::flash_factory_image(&image, port, baudrate, tx).await
            }
            Err(e) => {
                let _ = tx.send(TerminalMessage::new(
                    MessageKind::Output,
                    format!(
                        "Factory image creation failed ({}), using direct PlatformIO upload",
                        e
                    ),
                ));
                platformio::upload(port, &project_dir, tx).await
            }
        }
    }
}

/// Fail with an installation hint when an external tool is missing
pub fn ensure_tool(tool: &str, install_hint: &str) -> Result<()> {
    which::which(tool)
        .map(|_| ())
        .map_err(|_| anyhow!("{} not found, install it with: {}", tool, install_hint))
}

/// Run a subprocess and stream its output as terminal messages
///
/// stdout is consumed in small chunks so carriage-return progress updates
/// arrive live; stderr is folded into the same stream line by line. Returns
/// whether the process exited successfully.
pub async fn run_streaming(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    tx: &UnboundedSender<TerminalMessage>,
) -> Result<bool> {
    let _ = tx.send(TerminalMessage::command(format!(
        "Executing: {} {}",
        program,
        args.join(" ")
    )));

    let mut cmd = TokioCommand::new(program);
    cmd.args(args)
        .env("PYTHONUNBUFFERED", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
        let _ = tx.send(TerminalMessage::info(format!(
            "Working directory: {}",
            dir.display()
        )));
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("Failed to run {}", program))?;

    let stdout = child.stdout.take().expect("stdout piped");
    let stderr = child.stderr.take().expect("stderr piped");

    // stdout: chunked reads through the output chunker for live progress
    let tx_stdout = tx.clone();
    let stdout_task = tokio::spawn(async move {
        let mut reader = stdout;
        let mut chunker = OutputChunker::new();
        let mut buf = [0u8; 128];

        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                    for event in chunker.push(&chunk) {
                        let _ = tx_stdout.send(event_to_message(event));
                    }
                }
            }
        }

        if let Some(event) = chunker.flush() {
            let _ = tx_stdout.send(event_to_message(event));
        }
    });

    // stderr: line oriented, classified the same way
    let tx_stderr = tx.clone();
    let stderr_task = tokio::spawn(async move {
        use tokio::io::AsyncBufReadExt;
        let mut reader = tokio::io::BufReader::new(stderr);
        let mut buffer = String::new();

        while reader.read_line(&mut buffer).await.unwrap_or(0) > 0 {
            let line = crate::output::clean_ansi(buffer.trim());
            if !line.is_empty() {
                let _ = tx_stderr.send(TerminalMessage::new(crate::output::classify(&line), line));
            }
            buffer.clear();
        }
    });

    let status = child.wait().await?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    if status.success() {
        Ok(true)
    } else {
        let _ = tx.send(TerminalMessage::error(format!(
            "Command failed with code {}",
            status.code().unwrap_or(-1)
        )));
        Ok(false)
    }
}

/// Convert a chunker event into a terminal message
pub fn event_to_message(event: OutputEvent) -> TerminalMessage {
    match event {
        OutputEvent::Line { kind, text } => TerminalMessage::new(kind, text),
        OutputEvent::Progress(text) => TerminalMessage::new(MessageKind::Progress, text),
        OutputEvent::Partial(text) => TerminalMessage::new(MessageKind::Partial, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_write_flash_args_with_port() {
        let args = write_flash_args(Some("/dev/ttyUSB0"), 921600, &PathBuf::from("tmpfw/fw.bin"));
        assert_eq!(
            args,
            vec![
                "--baud",
                "921600",
                "--port",
                "/dev/ttyUSB0",
                "write-flash",
                "0x0",
                "tmpfw/fw.bin"
            ]
        );
    }

    #[test]
    fn test_write_flash_args_auto_port() {
        let args = write_flash_args(None, 460800, &PathBuf::from("fw.bin"));
        assert_eq!(args, vec!["--baud", "460800", "write-flash", "0x0", "fw.bin"]);
    }

    #[tokio::test]
    async fn test_run_streaming_success_exit() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let ok = run_streaming("true", &[], None, &tx).await.unwrap();
        assert!(ok);

        // First message echoes the command line
        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, MessageKind::Command);
        assert!(first.message.starts_with("Executing: true"));
    }

    #[tokio::test]
    async fn test_run_streaming_failure_exit() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let ok = run_streaming("false", &[], None, &tx).await.unwrap();
        assert!(!ok);

        let mut saw_error = false;
        while let Ok(msg) = rx.try_recv() {
            if msg.kind == MessageKind::Error {
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn test_run_streaming_missing_program() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let result = run_streaming("definitely-not-a-real-tool-xyz", &[], None, &tx).await;
        assert!(result.is_err());
    }
}
