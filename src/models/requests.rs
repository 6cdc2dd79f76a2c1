//! HTTP request/response models for the web server API

use serde::{Deserialize, Serialize};

fn default_port() -> String {
    "auto".to_string()
}

/// Request body for POST /api/flash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashRequest {
    pub firmware: String,
    #[serde(default = "default_port")]
    pub port: String,
}

/// Response body for POST /api/flash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashResponse {
    pub success: bool,
    pub message: String,
    pub firmware: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

/// Response body for POST /api/update-firmware
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub message: String,
    pub output: String,
}
