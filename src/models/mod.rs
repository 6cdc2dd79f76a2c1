//! Data models shared between the CLI, services and the web server

pub mod firmware;
pub mod messages;
pub mod requests;
pub mod serial;

pub use firmware::*;
pub use messages::*;
pub use requests::*;
pub use serial::*;
