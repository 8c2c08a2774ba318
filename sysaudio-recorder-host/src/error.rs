use serde::Serialize;
use thiserror::Error;

use sysaudio_recorder_core::{CaptureError, StartError, StopError};

/// Errors surfaced to the host application.
///
/// Each variant maps to a stable string code the host can branch on.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("no capture grant was provided")]
    NoProjection,

    #[error("failed to start recording: {0}")]
    StartFailed(#[from] StartError),

    #[error("failed to stop recording: {0}")]
    StopFailed(#[from] StopError),

    #[error("failed to list recordings: {0}")]
    ListFailed(#[source] CaptureError),

    #[error("overlay permission not granted")]
    NoPermission,

    #[error("overlay could not be started: {0}")]
    OverlayFailed(String),

    #[error("method not implemented: {0}")]
    NotImplemented(String),
}

impl PluginError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoProjection => "NO_PROJECTION",
            Self::StartFailed(_) | Self::OverlayFailed(_) => "START_FAILED",
            Self::StopFailed(_) => "STOP_FAILED",
            Self::ListFailed(_) => "LIST_FAILED",
            Self::NoPermission => "NO_PERMISSION",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Serializable error shape handed back over the method channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
}
