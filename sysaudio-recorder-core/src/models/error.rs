use std::path::PathBuf;

use thiserror::Error;

use super::release::ReleaseReport;

/// Errors raised by capture sources and sinks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("capture grant expired")]
    GrantExpired,

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("capture source lost")]
    SourceLost,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("timeout")]
    Timeout,

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Whether the drain loop must give up after this error.
    ///
    /// Everything else is treated as a transient, per-frame failure.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceLost | Self::PermissionDenied | Self::GrantExpired | Self::DeviceNotAvailable
        )
    }
}

/// Failure of `SessionController::start`.
///
/// Whatever the variant, no partially constructed session is left active.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("capture grant is missing or expired")]
    GrantInvalid,

    #[error("capture source unavailable: {0}")]
    SourceUnavailable(#[source] CaptureError),

    #[error("output sink unavailable: {0}")]
    SinkUnavailable(#[source] CaptureError),

    #[error("failed to spawn capture worker: {0}")]
    WorkerSpawnFailed(String),

    /// A previous worker could not be stopped and still holds its source.
    #[error("previous capture worker is still running")]
    WorkerStillRunning,
}

/// Failure of `SessionController::stop`.
///
/// `path` is still the session's recording. Unless the report carries a
/// `WorkerJoin` failure the data was flushed before this was returned; with
/// one, the stuck worker still holds the tail of the file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StopError {
    #[error("recording {} stopped but release failed: {report}", .path.display())]
    ReleaseFailed { path: PathBuf, report: ReleaseReport },
}

impl StopError {
    /// Path of the recording, which remains usable despite the error.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::ReleaseFailed { path, .. } => path,
        }
    }
}
