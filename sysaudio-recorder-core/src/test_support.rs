//! Scriptable doubles shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::error::CaptureError;
use crate::models::event::RecorderEvent;
use crate::models::format::PcmFormat;
use crate::overlay::display::OverlayDisplay;
use crate::traits::capture_source::{CaptureGrant, CaptureHandle, CaptureSource, SourceControl};
use crate::traits::host_channel::HostChannel;
use crate::traits::overlay_surface::OverlaySurface;

/// Counters observed across every fake source opened from one probe.
#[derive(Debug, Default)]
pub struct SourceProbe {
    pub opened: AtomicUsize,
    pub released: AtomicUsize,
    pub live_sources: AtomicUsize,
    pub max_live_sources: AtomicUsize,
    pub active_readers: AtomicUsize,
    pub max_active_readers: AtomicUsize,
    pub buffer_sizes: Mutex<Vec<usize>>,
}

impl SourceProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn live(&self) -> usize {
        self.live_sources.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live_sources.load(Ordering::SeqCst)
    }

    pub fn max_readers(&self) -> usize {
        self.max_active_readers.load(Ordering::SeqCst)
    }
}

/// What a fake source does when driven.
#[derive(Debug, Clone)]
pub struct FakeBehavior {
    pub valid: bool,
    pub fill: u8,
    /// Bytes returned per read; `None` fills the whole buffer.
    pub chunk: Option<usize>,
    pub read_delay: Duration,
    pub fail_open: Option<CaptureError>,
    pub fail_start: Option<CaptureError>,
    pub fail_release: Option<CaptureError>,
    /// First read blocks this long, ignoring cancellation. Releasing the
    /// device through its control ends the wait early.
    pub wedge_for: Option<Duration>,
    /// The wedged read also ignores a device release.
    pub wedge_ignores_release: bool,
    /// Every n-th read fails with a transient error.
    pub transient_error_every: Option<usize>,
    /// Read number at which the source is lost.
    pub lost_after: Option<usize>,
    pub panic_on_read: bool,
}

impl Default for FakeBehavior {
    fn default() -> Self {
        Self {
            valid: true,
            fill: 0xAB,
            chunk: None,
            read_delay: Duration::from_millis(2),
            fail_open: None,
            fail_start: None,
            fail_release: None,
            wedge_for: None,
            wedge_ignores_release: false,
            transient_error_every: None,
            lost_after: None,
            panic_on_read: false,
        }
    }
}

pub struct FakeGrant {
    behavior: FakeBehavior,
    probe: Arc<SourceProbe>,
}

impl FakeGrant {
    pub fn handle(behavior: FakeBehavior, probe: &Arc<SourceProbe>) -> CaptureHandle {
        CaptureHandle::new(Self {
            behavior,
            probe: Arc::clone(probe),
        })
    }
}

impl CaptureGrant for FakeGrant {
    fn is_valid(&self) -> bool {
        self.behavior.valid
    }

    fn open_source(
        self: Box<Self>,
        _format: &PcmFormat,
        buffer_size: usize,
    ) -> Result<Box<dyn CaptureSource>, CaptureError> {
        if let Some(err) = self.behavior.fail_open.clone() {
            return Err(err);
        }
        self.probe.buffer_sizes.lock().push(buffer_size);
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        let live = self.probe.live_sources.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_live_sources.fetch_max(live, Ordering::SeqCst);
        let control = Arc::new(FakeControl {
            probe: self.probe,
            fail_release: self.behavior.fail_release.clone(),
            released: AtomicBool::new(false),
        });
        Ok(Box::new(FakeSource {
            behavior: self.behavior,
            control,
            reads: 0,
        }))
    }
}

/// Device state shared between a fake source and its control handle.
pub struct FakeControl {
    probe: Arc<SourceProbe>,
    fail_release: Option<CaptureError>,
    released: AtomicBool,
}

impl FakeControl {
    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn mark_released(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.probe.released.fetch_add(1, Ordering::SeqCst);
            self.probe.live_sources.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl SourceControl for FakeControl {
    fn release(&self) -> Result<(), CaptureError> {
        if let Some(err) = self.fail_release.clone() {
            return Err(err);
        }
        self.mark_released();
        Ok(())
    }
}

pub struct FakeSource {
    behavior: FakeBehavior,
    control: Arc<FakeControl>,
    reads: usize,
}

impl CaptureSource for FakeSource {
    fn start(&mut self) -> Result<(), CaptureError> {
        match self.behavior.fail_start.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        let probe = &self.control.probe;
        let readers = probe.active_readers.fetch_add(1, Ordering::SeqCst) + 1;
        probe.max_active_readers.fetch_max(readers, Ordering::SeqCst);
        let result = self.read_inner(buf);
        self.control.probe.active_readers.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn release(&mut self) -> Result<(), CaptureError> {
        self.control.release()
    }

    fn control(&self) -> Arc<dyn SourceControl> {
        self.control.clone()
    }

    fn description(&self) -> String {
        format!("fake source 0x{:02x}", self.behavior.fill)
    }
}

impl FakeSource {
    fn read_inner(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        self.reads += 1;
        if self.behavior.panic_on_read {
            panic!("fake source exploded");
        }
        if self.reads == 1 {
            if let Some(wedge) = self.behavior.wedge_for {
                self.wedge(wedge);
            }
        }
        thread::sleep(self.behavior.read_delay);
        if self.control.is_released() {
            return Err(CaptureError::SourceLost);
        }

        if self.behavior.lost_after.is_some_and(|n| self.reads >= n) {
            return Err(CaptureError::SourceLost);
        }
        if self
            .behavior
            .transient_error_every
            .is_some_and(|n| self.reads % n == 0)
        {
            return Err(CaptureError::ReadFailed("overrun".into()));
        }

        let n = self.behavior.chunk.unwrap_or(buf.len()).min(buf.len());
        buf[..n].fill(self.behavior.fill);
        Ok(n)
    }
}

impl FakeSource {
    fn wedge(&self, wedge: Duration) {
        let deadline = Instant::now() + wedge;
        while Instant::now() < deadline {
            if self.control.is_released() && !self.behavior.wedge_ignores_release {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Drop for FakeSource {
    fn drop(&mut self) {
        self.control.mark_released();
    }
}

/// Everything a fake overlay surface was asked to do.
#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub renders: Vec<OverlayDisplay>,
    pub opened_recordings: usize,
    pub dismissed: usize,
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn last_render(&self) -> Option<OverlayDisplay> {
        self.log.lock().renders.last().cloned()
    }
}

impl OverlaySurface for RecordingSurface {
    fn render(&mut self, display: &OverlayDisplay) {
        self.log.lock().renders.push(display.clone());
    }

    fn open_recordings(&mut self) {
        self.log.lock().opened_recordings += 1;
    }

    fn dismiss(&mut self) {
        self.log.lock().dismissed += 1;
    }
}

/// Host channel that records every event it receives.
#[derive(Clone, Default)]
pub struct RecordingChannel {
    pub events: Arc<Mutex<Vec<RecorderEvent>>>,
}

impl RecordingChannel {
    pub fn events(&self) -> Vec<RecorderEvent> {
        self.events.lock().clone()
    }
}

impl HostChannel for RecordingChannel {
    fn deliver(&self, event: RecorderEvent) -> Result<(), String> {
        self.events.lock().push(event);
        Ok(())
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
