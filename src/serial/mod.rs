//! Serial port enumeration and monitoring

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio_serial::SerialPortBuilderExt;

use crate::models::{MessageKind, SerialPortInfo, TerminalMessage};

/// List serial ports for the web UI port picker
///
/// Virtual and internal ports without a usable hardware ID are filtered out;
/// the "auto" pseudo-port always comes first.
pub fn list_ports() -> Vec<SerialPortInfo> {
    let mut ports = vec![SerialPortInfo::auto()];

    match serialport::available_ports() {
        Ok(available) => {
            for port in available {
                if let Some(info) = describe_port(&port) {
                    ports.push(info);
                }
            }
        }
        Err(e) => warn!("Error listing serial ports: {}", e),
    }

    ports
}

fn describe_port(port: &serialport::SerialPortInfo) -> Option<SerialPortInfo> {
    use serialport::SerialPortType;

    match &port.port_type {
        SerialPortType::UsbPort(usb) => Some(SerialPortInfo {
            device: port.port_name.clone(),
            description: usb
                .product
                .clone()
                .unwrap_or_else(|| "Unknown device".to_string()),
            hwid: format!("USB VID:PID={:04x}:{:04x}", usb.vid, usb.pid),
        }),
        SerialPortType::PciPort => Some(SerialPortInfo {
            device: port.port_name.clone(),
            description: "PCI serial port".to_string(),
            hwid: "PCI".to_string(),
        }),
        // Bluetooth and unknown ports have no usable hardware ID
        _ => None,
    }
}

/// Stream lines from a serial port as monitor messages
///
/// Runs until the port errors out or the receiving side goes away. Bytes that
/// are not valid UTF-8 are forwarded as a hex dump line.
pub async fn monitor_port(
    port: String,
    baudrate: u32,
    tx: UnboundedSender<TerminalMessage>,
) -> Result<()> {
    let mut serial = tokio_serial::new(&port, baudrate)
        .open_native_async()
        .with_context(|| format!("Could not open serial port {}", port))?;

    info!("Serial monitor connected to {} at {} baud", port, baudrate);
    let _ = tx.send(TerminalMessage::success(format!(
        "Connected to {} at {} baud",
        port, baudrate
    )));

    let mut buffer = String::new();
    let mut pending: Vec<u8> = Vec::new();
    let mut raw = [0u8; 256];

    loop {
        let n = match serial.read(&mut raw).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                let _ = tx.send(TerminalMessage::error(format!("Serial error: {}", e)));
                return Err(e.into());
            }
        };

        pending.extend_from_slice(&raw[..n]);
        for hex_line in decode_pending(&mut pending, &mut buffer) {
            if tx
                .send(TerminalMessage::new(MessageKind::Monitor, hex_line))
                .is_err()
            {
                return Ok(());
            }
        }

        while let Some(pos) = buffer.find(['\n', '\r']) {
            let line = buffer[..pos].trim().to_string();
            buffer.drain(..=pos);
            if line.is_empty() {
                continue;
            }
            if tx
                .send(TerminalMessage::new(MessageKind::Monitor, line))
                .is_err()
            {
                return Ok(());
            }
        }
    }

    Ok(())
}

/// Decode as much of the pending byte buffer as possible
///
/// Valid text is appended to `text`; genuinely invalid byte spans come back
/// as `[HEX]` dump lines. A multi-byte sequence cut off at the end of the
/// buffer stays pending until the next read completes it.
fn decode_pending(pending: &mut Vec<u8>, text: &mut String) -> Vec<String> {
    let mut hex_lines = Vec::new();

    loop {
        match std::str::from_utf8(pending) {
            Ok(valid) => {
                text.push_str(valid);
                pending.clear();
                break;
            }
            Err(e) => {
                let valid_len = e.valid_up_to();
                if let Ok(valid) = std::str::from_utf8(&pending[..valid_len]) {
                    text.push_str(valid);
                }
                match e.error_len() {
                    // Incomplete sequence at the buffer end, wait for more
                    None => {
                        pending.drain(..valid_len);
                        break;
                    }
                    Some(bad_len) => {
                        let hex: Vec<String> = pending[valid_len..valid_len + bad_len]
                            .iter()
                            .map(|b| format!("{:02x}", b))
                            .collect();
                        hex_lines.push(format!("[HEX] {}", hex.join(" ")));
                        pending.drain(..valid_len + bad_len);
                    }
                }
            }
        }
    }

    hex_lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_list_starts_with_auto() {
        let ports = list_ports();
        assert!(!ports.is_empty());
        assert_eq!(ports[0].device, "auto");
        assert_eq!(ports[0].description, "Auto-detect");
    }

    #[test]
    fn test_decode_carries_split_multibyte_char() {
        // "é" is 0xC3 0xA9; the read boundary falls between its bytes
        let mut pending = b"temp\xC3".to_vec();
        let mut text = String::new();
        assert!(decode_pending(&mut pending, &mut text).is_empty());
        assert_eq!(text, "temp");
        assert_eq!(pending, vec![0xC3]);

        pending.extend_from_slice(b"\xA9C\n");
        assert!(decode_pending(&mut pending, &mut text).is_empty());
        assert_eq!(text, "temp\u{e9}C\n");
        assert!(pending.is_empty());
    }

    #[test]
    fn test_decode_invalid_bytes_become_hex() {
        let mut pending = b"ok\xFF\xFEmore".to_vec();
        let mut text = String::new();
        let hex_lines = decode_pending(&mut pending, &mut text);
        assert_eq!(text, "okmore");
        assert_eq!(hex_lines, vec!["[HEX] ff".to_string(), "[HEX] fe".to_string()]);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_monitor_unopenable_port_errors() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let result = monitor_port("/dev/does-not-exist".to_string(), 115200, tx).await;
        assert!(result.is_err());
    }
}
