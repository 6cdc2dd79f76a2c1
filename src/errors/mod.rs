//! Error types for WebUIFlasher

pub mod types;

pub use types::*;
