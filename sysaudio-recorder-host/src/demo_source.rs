use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sysaudio_recorder_core::{CaptureError, CaptureGrant, CaptureHandle, CaptureSource, PcmFormat, SourceControl};

const AMPLITUDE: f32 = 0.25;

/// Synthetic capture grant producing a sine tone.
///
/// **NOT A REAL CAPTURE**: stands in for the platform projection grant so the
/// demo host can record without one. Reads are paced to wall-clock time.
pub struct ToneGrant {
    frequency_hz: f32,
}

impl ToneGrant {
    pub fn new(frequency_hz: f32) -> Self {
        Self { frequency_hz }
    }

    pub fn handle(frequency_hz: f32) -> CaptureHandle {
        CaptureHandle::new(Self::new(frequency_hz))
    }
}

impl CaptureGrant for ToneGrant {
    fn is_valid(&self) -> bool {
        self.frequency_hz.is_finite() && self.frequency_hz > 0.0
    }

    fn open_source(
        self: Box<Self>,
        format: &PcmFormat,
        buffer_size: usize,
    ) -> Result<Box<dyn CaptureSource>, CaptureError> {
        if format.bit_depth != 16 {
            return Err(CaptureError::ConfigurationFailed(format!(
                "tone source only produces 16-bit PCM, got {}",
                format
            )));
        }
        log::debug!("Opening tone source at {} Hz ({} byte reads)", self.frequency_hz, buffer_size);
        Ok(Box::new(ToneSource {
            format: *format,
            step: TAU * self.frequency_hz / format.sample_rate as f32,
            phase: 0.0,
            started_at: None,
            frames_emitted: 0,
            control: Arc::new(ToneControl::default()),
        }))
    }
}

pub struct ToneSource {
    format: PcmFormat,
    step: f32,
    phase: f32,
    started_at: Option<Instant>,
    frames_emitted: u64,
    control: Arc<ToneControl>,
}

/// Release flag shared with the reading thread.
#[derive(Debug, Default)]
pub struct ToneControl {
    released: AtomicBool,
}

impl ToneControl {
    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl SourceControl for ToneControl {
    fn release(&self) -> Result<(), CaptureError> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl ToneSource {
    /// Block until the frames already handed out are due in real time.
    fn pace(&self, started_at: Instant) {
        let due = Duration::from_secs_f64(self.frames_emitted as f64 / self.format.sample_rate as f64);
        let elapsed = started_at.elapsed();
        if due > elapsed {
            thread::sleep(due - elapsed);
        }
    }
}

impl CaptureSource for ToneSource {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.control.is_released() {
            return Err(CaptureError::SourceLost);
        }
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        if self.control.is_released() {
            return Err(CaptureError::SourceLost);
        }
        let Some(started_at) = self.started_at else {
            return Err(CaptureError::Unknown("tone source not started".into()));
        };

        let frame_bytes = self.format.bytes_per_frame();
        let frames = buf.len() / frame_bytes;
        for frame in buf.chunks_exact_mut(frame_bytes) {
            let sample = (self.phase.sin() * AMPLITUDE * i16::MAX as f32) as i16;
            for channel in frame.chunks_exact_mut(2) {
                channel.copy_from_slice(&sample.to_le_bytes());
            }
            self.phase = (self.phase + self.step) % TAU;
        }
        self.frames_emitted += frames as u64;
        self.pace(started_at);
        Ok(frames * frame_bytes)
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.started_at = None;
        Ok(())
    }

    fn release(&mut self) -> Result<(), CaptureError> {
        self.started_at = None;
        self.control.release()
    }

    fn control(&self) -> Arc<dyn SourceControl> {
        self.control.clone()
    }

    fn description(&self) -> String {
        format!("tone source ({})", self.format)
    }
}
