//! # sysaudio-recorder-core
//!
//! Platform-agnostic core of the system-audio recorder.
//!
//! A host acquires a capture grant out of band and hands it over as a
//! [`CaptureHandle`]. The [`SessionController`] turns it into a live capture
//! source, drains PCM into a timestamped file on a worker thread, and
//! guarantees that at most one session is ever live. The floating overlay is
//! a pure [`OverlayStateMachine`] run on its own UI thread by
//! [`OverlayDriver`], and recorder events reach the host through the
//! [`EventBridge`].
//!
//! ## Architecture
//!
//! ```text
//! sysaudio-recorder-core (this crate)
//! ├── traits/    ← CaptureSource, SourceControl, CaptureGrant, HostChannel, OverlaySurface
//! ├── models/    ← CaptureError, PcmFormat, CaptureConfiguration, OverlayState, ReleaseReport
//! ├── session/   ← SessionController, capture worker, cancellation
//! ├── storage/   ← CaptureSink, recordings listing
//! ├── overlay/   ← state machine, display derivation, UI driver
//! └── bridge/    ← EventBridge (host channel registry)
//! ```

pub mod bridge;
pub mod models;
pub mod overlay;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use bridge::event_bridge::EventBridge;
pub use models::config::{CaptureConfiguration, OverlayTiming};
pub use models::error::{CaptureError, StartError, StopError};
pub use models::event::RecorderEvent;
pub use models::format::PcmFormat;
pub use models::release::{ReleaseFailure, ReleaseReport, ReleaseStage};
pub use models::state::{OverlaySnapshot, OverlayState};
pub use overlay::display::{OverlayDisplay, StopLabel};
pub use overlay::driver::{OverlayDriver, OverlayHandle};
pub use overlay::machine::{OverlayInput, OverlayStateMachine, Scheduled, TimerKind};
pub use session::controller::SessionController;
pub use session::worker::DrainStats;
pub use storage::recordings::{list_recordings, RecordingEntry};
pub use storage::sink::CaptureSink;
pub use traits::capture_source::{CaptureGrant, CaptureHandle, CaptureSource, SourceControl};
pub use traits::host_channel::HostChannel;
pub use traits::overlay_surface::OverlaySurface;
