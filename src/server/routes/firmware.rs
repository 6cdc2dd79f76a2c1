//! Firmware listing routes

use log::error;
use serde_json::json;
use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;

use crate::models::FirmwareInfo;
use crate::server::app::ServerState;
use crate::server::routes::with_state;

/// Create GET /api/firmware and GET /api/firmware/{name}
pub fn create_firmware_routes(
    state: Arc<ServerState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let list = warp::path!("api" / "firmware")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_firmware_handler);

    let detail = warp::path!("api" / "firmware" / String)
        .and(warp::get())
        .and(with_state(state))
        .and_then(firmware_detail_handler);

    list.or(detail)
}

async fn list_firmware_handler(
    state: Arc<ServerState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let infos = match state.load_sources() {
        Ok(config) => FirmwareInfo::list_all(&config),
        Err(e) => {
            error!("Error loading firmware list: {}", e);
            Vec::new()
        }
    };
    Ok(warp::reply::json(&infos))
}

async fn firmware_detail_handler(
    name: String,
    state: Arc<ServerState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let config = match state.load_sources() {
        Ok(config) => config,
        Err(e) => {
            let body = json!({"detail": format!("{}", e)});
            return Ok(warp::reply::with_status(
                warp::reply::json(&body),
                StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
    };

    match config.find_source(&name) {
        Some(source) => {
            let info = FirmwareInfo::from_source(source, &config);
            Ok(warp::reply::with_status(
                warp::reply::json(&info),
                StatusCode::OK,
            ))
        }
        None => {
            let body = json!({"detail": format!("Firmware '{}' not found", name)});
            Ok(warp::reply::with_status(
                warp::reply::json(&body),
                StatusCode::NOT_FOUND,
            ))
        }
    }
}
