//! WebSocket terminal route
//!
//! One connection gives the browser a live terminal: flash commands, raw
//! esptool invocations, firmware updates and serial monitors all stream their
//! output back as JSON messages over the same socket.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use tokio::sync::mpsc;
use warp::Filter;

use crate::config::SourceType;
use crate::models::{MessageKind, TerminalCommand, TerminalMessage};
use crate::server::app::ServerState;
use crate::server::routes::with_state;
use crate::server::services::MonitorRegistry;
use crate::services::flash_service::{ESPTOOL, ensure_tool, run_streaming};
use crate::services::{FlashService, UpdateService};

/// Create WS /ws/terminal
pub fn create_terminal_route(
    state: Arc<ServerState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("ws")
        .and(warp::path("terminal"))
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_state(state))
        .map(|ws: warp::ws::Ws, state: Arc<ServerState>| {
            ws.on_upgrade(move |socket| terminal_handler(socket, state))
        })
}

/// Per-connection terminal session
async fn terminal_handler(ws: warp::ws::WebSocket, state: Arc<ServerState>) {
    info!("Terminal WebSocket connected");

    let (mut ws_sender, mut ws_receiver) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<TerminalMessage>();

    // Forward terminal messages to the browser as JSON text frames
    let forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to serialize terminal message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(warp::ws::Message::text(json)).await.is_err() {
                break;
            }
        }
    });

    let _ = tx.send(TerminalMessage::info("🚀 WebSocket Terminal connected"));

    let mut monitors = MonitorRegistry::new();

    while let Some(result) = ws_receiver.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Terminal WebSocket error: {}", e);
                break;
            }
        };

        if msg.is_close() {
            break;
        }
        let Ok(text) = msg.to_str() else {
            continue;
        };

        monitors.reap_finished();

        match serde_json::from_str::<TerminalCommand>(text) {
            Ok(command) => {
                handle_command(command, &state, &mut monitors, &tx).await;
            }
            Err(_) => {
                let _ = tx.send(TerminalMessage::error("Unknown command type"));
            }
        }
    }

    monitors.abort_all();
    drop(tx);
    let _ = forward_task.await;
    info!("Terminal WebSocket disconnected");
}

async fn handle_command(
    command: TerminalCommand,
    state: &Arc<ServerState>,
    monitors: &mut MonitorRegistry,
    tx: &mpsc::UnboundedSender<TerminalMessage>,
) {
    match command {
        TerminalCommand::Flash { firmware, port } => {
            flash_command(&firmware, &port, state, tx).await;
        }
        TerminalCommand::Esptool { command } => {
            esptool_command(&command, tx).await;
        }
        TerminalCommand::UpdateFirmware => {
            update_command(state, tx).await;
        }
        TerminalCommand::Monitor { port, baudrate } => {
            if port == "auto" {
                let _ = tx.send(TerminalMessage::error(
                    "Monitor needs a concrete port, not 'auto'",
                ));
                return;
            }
            let _ = tx.send(TerminalMessage::command(format!(
                "monitor {} @ {} baud",
                port, baudrate
            )));
            match monitors.start(&port, baudrate, tx.clone()) {
                Ok(()) => {
                    let _ = tx.send(TerminalMessage::info(format!(
                        "Starting serial monitor on {}",
                        port
                    )));
                }
                Err(e) => {
                    let _ = tx.send(TerminalMessage::error(e));
                }
            }
        }
        TerminalCommand::StopMonitor { port } => {
            if monitors.stop(&port) {
                let _ = tx.send(TerminalMessage::info(format!(
                    "Stopped serial monitor on {}",
                    port
                )));
            } else {
                let _ = tx.send(TerminalMessage::error(format!(
                    "No serial monitor running on {}",
                    port
                )));
            }
        }
        TerminalCommand::Ping => {
            let _ = tx.send(TerminalMessage::new(
                MessageKind::Pong,
                "Terminal connection alive",
            ));
        }
    }
}

async fn flash_command(
    firmware: &str,
    port: &str,
    state: &Arc<ServerState>,
    tx: &mpsc::UnboundedSender<TerminalMessage>,
) {
    let config = match state.load_sources() {
        Ok(config) => config,
        Err(e) => {
            let _ = tx.send(TerminalMessage::error(format!(
                "Failed to load sources: {}",
                e
            )));
            return;
        }
    };

    let Some(source) = config.find_source(firmware) else {
        let _ = tx.send(TerminalMessage::error(format!(
            "Unknown firmware: {}",
            firmware
        )));
        return;
    };
    if source.source_type == SourceType::Github && !config.firmware_path(firmware).exists() {
        let _ = tx.send(TerminalMessage::error(format!(
            "Firmware binary for {} is not downloaded yet. Run the firmware update first.",
            firmware
        )));
        return;
    }

    let _ = tx.send(TerminalMessage::command(format!(
        "flash firmware: {}",
        firmware
    )));

    let port = (port != "auto").then_some(port);
    let baudrate = state.config.baudrate;
    let service = FlashService::new(config);

    match service.flash_firmware(firmware, port, baudrate, tx).await {
        Ok(true) => {}
        Ok(false) => {
            let _ = tx.send(TerminalMessage::error(format!(
                "Flashing {} failed",
                firmware
            )));
        }
        Err(e) => {
            let _ = tx.send(TerminalMessage::error(format!("Flash error: {}", e)));
        }
    }
}

async fn esptool_command(command: &str, tx: &mpsc::UnboundedSender<TerminalMessage>) {
    let args: Vec<String> = command.split_whitespace().map(str::to_string).collect();
    if args.is_empty() {
        let _ = tx.send(TerminalMessage::error("Empty esptool command"));
        return;
    }

    if let Err(e) = ensure_tool(ESPTOOL, "pip install esptool") {
        let _ = tx.send(TerminalMessage::error(e.to_string()));
        return;
    }

    match run_streaming(ESPTOOL, &args, None, tx).await {
        Ok(true) => {
            let _ = tx.send(TerminalMessage::success("✅ esptool command completed"));
        }
        Ok(false) => {
            let _ = tx.send(TerminalMessage::error("❌ esptool command failed"));
        }
        Err(e) => {
            let _ = tx.send(TerminalMessage::error(format!("esptool error: {}", e)));
        }
    }
}

async fn update_command(state: &Arc<ServerState>, tx: &mpsc::UnboundedSender<TerminalMessage>) {
    let config = match state.load_sources() {
        Ok(config) => config,
        Err(e) => {
            let _ = tx.send(TerminalMessage::error(format!(
                "Failed to load sources: {}",
                e
            )));
            return;
        }
    };

    let _ = tx.send(TerminalMessage::command("update firmware"));

    let service = UpdateService::new();
    match service.update_all(&config, false, tx).await {
        Ok(summary) if summary.failed == 0 => {
            let _ = tx.send(TerminalMessage::success("✅ Firmware update complete"));
        }
        Ok(_) => {
            let _ = tx.send(TerminalMessage::error(
                "❌ Firmware update finished with failures",
            ));
        }
        Err(e) => {
            let _ = tx.send(TerminalMessage::error(format!("Update error: {}", e)));
        }
    }
}
