//! Embedded web UI assets

use include_dir::{Dir, include_dir};
use warp::http::StatusCode;
use warp::{Filter, Reply};

// Include the web assets directory at compile time
static WEB_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/web");

/// Create static file serving routes for the flashing UI
pub fn create_static_routes()
-> impl warp::Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let index = warp::path::end().and_then(serve_index);
    let assets = warp::path::tail().and_then(serve_asset);

    index.or(assets)
}

/// Serve the main flashing UI page
async fn serve_index() -> Result<impl warp::Reply, warp::Rejection> {
    if let Some(file) = WEB_ASSETS.get_file("index.html") {
        Ok(
            warp::reply::with_header(file.contents(), "content-type", "text/html; charset=utf-8")
                .into_response(),
        )
    } else {
        let html = create_minimal_page();
        Ok(
            warp::reply::with_header(html, "content-type", "text/html; charset=utf-8")
                .into_response(),
        )
    }
}

/// Serve an embedded asset by path
async fn serve_asset(path: warp::path::Tail) -> Result<impl warp::Reply, warp::Rejection> {
    let file_path = path.as_str();

    // Security: prevent directory traversal
    if file_path.contains("..") {
        return Ok(
            warp::reply::with_status("Access denied".to_string(), StatusCode::FORBIDDEN)
                .into_response(),
        );
    }

    if let Some(file) = WEB_ASSETS.get_file(file_path) {
        let content_type = get_content_type(file_path);
        Ok(
            warp::reply::with_header(file.contents(), "content-type", content_type)
                .into_response(),
        )
    } else {
        Ok(
            warp::reply::with_status("File not found".to_string(), StatusCode::NOT_FOUND)
                .into_response(),
        )
    }
}

/// Determine MIME type based on file extension
fn get_content_type(file_path: &str) -> &'static str {
    if file_path.ends_with(".html") {
        "text/html; charset=utf-8"
    } else if file_path.ends_with(".css") {
        "text/css"
    } else if file_path.ends_with(".js") {
        "application/javascript"
    } else if file_path.ends_with(".json") {
        "application/json"
    } else if file_path.ends_with(".png") {
        "image/png"
    } else if file_path.ends_with(".svg") {
        "image/svg+xml"
    } else if file_path.ends_with(".ico") {
        "image/x-icon"
    } else {
        "application/octet-stream"
    }
}

/// Minimal page used when the embedded assets are missing
fn create_minimal_page() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>WebUIFlasher</title>
</head>
<body>
    <h1>🔧 WebUIFlasher</h1>
    <p>The web assets were not bundled into this build.</p>
    <p>The JSON API is still available under <code>/api/</code>.</p>
</body>
</html>"#
        .to_string()
}
