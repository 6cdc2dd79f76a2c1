//! HTTP routes for the web UI server

pub mod firmware;
pub mod flash;
pub mod health;
pub mod ports;
pub mod static_files;
pub mod update;
pub mod websocket;

use std::sync::Arc;
use warp::Filter;

use crate::server::app::ServerState;

/// Create all server routes
///
/// Static files come last so they never shadow the API.
pub fn create_routes(
    state: Arc<ServerState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    health::create_health_route()
        .or(firmware::create_firmware_routes(state.clone()))
        .or(ports::create_ports_route())
        .or(flash::create_flash_route(state.clone()))
        .or(update::create_update_route(state.clone()))
        .or(websocket::create_terminal_route(state))
        .or(static_files::create_static_routes())
}

/// Helper to pass server state to handlers
pub(crate) fn with_state(
    state: Arc<ServerState>,
) -> impl Filter<Extract = (Arc<ServerState>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}
