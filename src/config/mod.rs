//! Configuration management
//!
//! The firmware manifest (`sources.yaml`) names every flashable firmware and
//! where it comes from: a GitHub release asset or a local PlatformIO project.

pub mod sources;

pub use sources::*;
