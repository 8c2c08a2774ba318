//! # sysaudio-recorder-host
//!
//! Host-facing surface of the system-audio recorder: the [`RecorderPlugin`]
//! entry point, its configuration and error types, and the pieces the demo
//! binary uses to run without a platform capture grant.

pub mod config;
pub mod console_surface;
pub mod demo_source;
pub mod environment;
pub mod error;
pub mod plugin;

pub use config::{ConfigError, RecorderConfig};
pub use environment::{HeadlessEnvironment, HostEnvironment};
pub use error::{ErrorPayload, PluginError};
pub use plugin::RecorderPlugin;
