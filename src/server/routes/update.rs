//! Firmware update endpoint

use std::sync::Arc;
use warp::Filter;

use crate::models::UpdateResponse;
use crate::server::app::ServerState;
use crate::server::routes::with_state;
use crate::services::UpdateService;

/// Create POST /api/update-firmware
pub fn create_update_route(
    state: Arc<ServerState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "update-firmware")
        .and(warp::post())
        .and(with_state(state))
        .and_then(update_handler)
}

async fn update_handler(state: Arc<ServerState>) -> Result<impl warp::Reply, warp::Rejection> {
    let config = match state.load_sources() {
        Ok(config) => config,
        Err(e) => {
            return Ok(warp::reply::json(&UpdateResponse {
                success: false,
                message: format!("Failed to load sources: {}", e),
                output: String::new(),
            }));
        }
    };

    // Collect updater messages so the response carries the full output
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<crate::models::TerminalMessage>();
    let collect_task = tokio::spawn(async move {
        let mut output = String::new();
        while let Some(msg) = rx.recv().await {
            output.push_str(&msg.message);
            output.push('\n');
        }
        output
    });

    let service = UpdateService::new();
    let result = service.update_all(&config, false, &tx).await;
    drop(tx);
    let output = collect_task.await.unwrap_or_default();

    let response = match result {
        Ok(summary) if summary.failed == 0 => UpdateResponse {
            success: true,
            message: "Firmware update completed successfully".to_string(),
            output,
        },
        Ok(summary) => UpdateResponse {
            success: false,
            message: format!("Firmware update finished with {} failure(s)", summary.failed),
            output,
        },
        Err(e) => UpdateResponse {
            success: false,
            message: format!("Failed to run firmware update: {}", e),
            output,
        },
    };

    Ok(warp::reply::json(&response))
}
