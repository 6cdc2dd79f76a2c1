//! Synchronous flash endpoint

use log::{error, info};
use serde_json::json;
use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;

use crate::config::SourceType;
use crate::models::{FlashRequest, FlashResponse};
use crate::server::app::ServerState;
use crate::server::routes::with_state;
use crate::services::FlashService;

/// Create POST /api/flash
pub fn create_flash_route(
    state: Arc<ServerState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "flash")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(flash_handler)
}

async fn flash_handler(
    request: FlashRequest,
    state: Arc<ServerState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    info!("Flash request for '{}' on {}", request.firmware, request.port);

    let config = match state.load_sources() {
        Ok(config) => config,
        Err(e) => return Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    };

    let Some(source) = config.find_source(&request.firmware) else {
        return Ok(error_reply(
            StatusCode::NOT_FOUND,
            format!("Firmware '{}' not found in configuration", request.firmware),
        ));
    };

    // Local projects build on demand; github sources need the download
    if source.source_type == SourceType::Github && !config.firmware_path(&request.firmware).exists()
    {
        return Ok(error_reply(
            StatusCode::NOT_FOUND,
            format!(
                "Firmware '{}' binary not found. Run the firmware update first.",
                request.firmware
            ),
        ));
    }

    let port = (request.port != "auto").then_some(request.port.as_str());
    let baudrate = state.config.baudrate;

    // Flash output goes to the server log; the WebSocket terminal is the
    // place for live streaming.
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<crate::models::TerminalMessage>();
    let log_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            info!("[flash] {}", msg.message);
        }
    });

    let service = FlashService::new(config);
    let result = service
        .flash_firmware(&request.firmware, port, baudrate, &tx)
        .await;
    drop(tx);
    let _ = log_task.await;

    match result {
        Ok(true) => {
            let response = FlashResponse {
                success: true,
                message: format!("Successfully flashed {}", request.firmware),
                firmware: request.firmware,
                port: Some(request.port),
            };
            Ok(warp::reply::with_status(
                warp::reply::json(&response),
                StatusCode::OK,
            ))
        }
        Ok(false) => Ok(error_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Flash operation failed. Check ESP32 connection and try again.".to_string(),
        )),
        Err(e) => {
            error!("Flash operation failed: {}", e);
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Flash operation failed: {}", e),
            ))
        }
    }
}

fn error_reply(status: StatusCode, detail: String) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&json!({ "detail": detail })), status)
}
