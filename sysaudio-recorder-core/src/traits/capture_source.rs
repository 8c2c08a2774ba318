use std::fmt;
use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::models::format::PcmFormat;

/// A live, configured capture of the device-mixed audio stream.
///
/// Reads block until data is available; a live source never reports
/// end-of-stream, so the worker stops only when the controller cancels it.
/// Implementations must release their OS resources on drop as well, since a
/// worker that misses its bounded join hands the source back only when it
/// eventually exits.
pub trait CaptureSource: Send {
    /// Begin delivering audio.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Fill `buf` with interleaved PCM bytes, returning how many were written.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError>;

    /// Stop delivering audio.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Release the underlying device. Must tolerate being called after
    /// [`SourceControl::release`].
    fn release(&mut self) -> Result<(), CaptureError>;

    /// Handle onto the same device that other threads may use while `read`
    /// is blocked.
    fn control(&self) -> Arc<dyn SourceControl>;

    /// Human-readable description for logging.
    fn description(&self) -> String;
}

/// Thread-safe side channel to a [`CaptureSource`]'s device.
///
/// The controller falls back to this when the worker misses its join
/// deadline: releasing the device must make an in-flight `read` return
/// (with an error) so the worker can exit and hand its sink back.
pub trait SourceControl: Send + Sync {
    /// Stop and release the device. Idempotent.
    fn release(&self) -> Result<(), CaptureError>;
}

/// An externally granted authorization to capture system audio.
///
/// How the grant is obtained (user consent, projection tokens) is the
/// host's business; the controller only asks whether it is still usable
/// and turns it into a source exactly once.
pub trait CaptureGrant: Send {
    /// Whether the grant can still be used.
    fn is_valid(&self) -> bool;

    /// Open a source producing `format` frames, read `buffer_size` bytes at a time.
    fn open_source(
        self: Box<Self>,
        format: &PcmFormat,
        buffer_size: usize,
    ) -> Result<Box<dyn CaptureSource>, CaptureError>;
}

/// Opaque, single-use capture authorization accepted by `SessionController::start`.
pub struct CaptureHandle {
    grant: Box<dyn CaptureGrant>,
}

impl CaptureHandle {
    pub fn new(grant: impl CaptureGrant + 'static) -> Self {
        Self {
            grant: Box::new(grant),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.grant.is_valid()
    }

    /// Consume the handle and open its source.
    pub(crate) fn open_source(
        self,
        format: &PcmFormat,
        buffer_size: usize,
    ) -> Result<Box<dyn CaptureSource>, CaptureError> {
        self.grant.open_source(format, buffer_size)
    }
}

impl From<Box<dyn CaptureGrant>> for CaptureHandle {
    fn from(grant: Box<dyn CaptureGrant>) -> Self {
        Self { grant }
    }
}

impl fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("valid", &self.grant.is_valid())
            .finish()
    }
}
