//! Flashing and firmware-update services
//!
//! All real flashing work happens in external tools (esptool, PlatformIO).
//! These services assemble their command lines, run them as subprocesses and
//! stream their output as terminal messages, so the CLI and the web server
//! share one code path.

pub mod factory;
pub mod flash_service;
pub mod platformio;
pub mod update_service;

pub use flash_service::FlashService;
pub use update_service::UpdateService;
