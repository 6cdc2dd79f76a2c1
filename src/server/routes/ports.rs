//! Serial port listing route

use warp::Filter;

/// Create GET /api/serial-ports
pub fn create_ports_route()
-> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "serial-ports")
        .and(warp::get())
        .and_then(list_ports_handler)
}

async fn list_ports_handler() -> Result<impl warp::Reply, warp::Rejection> {
    // Port enumeration touches the OS, keep it off the reactor
    let ports = tokio::task::spawn_blocking(crate::serial::list_ports)
        .await
        .unwrap_or_default();
    Ok(warp::reply::json(&ports))
}
