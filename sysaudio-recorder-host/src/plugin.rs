use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use sysaudio_recorder_core::{
    list_recordings, CaptureError, CaptureHandle, EventBridge, HostChannel, OverlayDriver, OverlayHandle,
    OverlayInput, OverlaySnapshot, OverlayStateMachine, OverlaySurface, OverlayTiming, RecordingEntry,
    SessionController,
};

use crate::config::RecorderConfig;
use crate::environment::HostEnvironment;
use crate::error::PluginError;

/// Host-facing entry point: capture session, floating overlay, and the
/// event bridge between them.
pub struct RecorderPlugin {
    controller: SessionController,
    bridge: Arc<EventBridge>,
    environment: Arc<dyn HostEnvironment>,
    timing: OverlayTiming,
    overlay: Mutex<Option<OverlayHandle>>,
}

impl RecorderPlugin {
    pub fn new(config: RecorderConfig, environment: Arc<dyn HostEnvironment>) -> Result<Self, CaptureError> {
        Ok(Self {
            controller: SessionController::new(config.capture)?,
            bridge: EventBridge::new(),
            environment,
            timing: config.overlay,
            overlay: Mutex::new(None),
        })
    }

    // -- Capture --

    /// Start recording from `grant`. `None` means the user declined (or the
    /// host never obtained) the capture grant.
    pub fn start_record(&self, grant: Option<CaptureHandle>) -> Result<PathBuf, PluginError> {
        let handle = grant.ok_or(PluginError::NoProjection)?;
        let path = self.controller.start(handle)?;
        Ok(path)
    }

    pub fn stop_record(&self) -> Result<Option<PathBuf>, PluginError> {
        Ok(self.controller.stop()?)
    }

    pub fn is_recording(&self) -> bool {
        self.controller.is_active()
    }

    pub fn list_recordings(&self) -> Result<Vec<RecordingEntry>, PluginError> {
        let config = self.controller.config();
        list_recordings(&config.output_directory, &config.file_extension).map_err(PluginError::ListFailed)
    }

    // -- Floating overlay --

    pub fn start_floating_recorder(&self, surface: Box<dyn OverlaySurface>) -> Result<(), PluginError> {
        if !self.environment.can_draw_overlays() {
            self.environment.request_overlay_permission();
            return Err(PluginError::NoPermission);
        }

        let mut overlay = self.overlay.lock();
        if overlay.as_ref().is_some_and(OverlayHandle::is_running) {
            log::debug!("Floating recorder already running");
            return Ok(());
        }

        let machine = OverlayStateMachine::new(Arc::clone(&self.bridge), self.timing);
        let handle = OverlayDriver::spawn(machine, surface).map_err(|e| PluginError::OverlayFailed(e.to_string()))?;
        // Replaces a handle whose overlay already closed itself.
        *overlay = Some(handle);
        drop(overlay);

        log::info!("Floating recorder started");
        self.environment.move_to_background();
        Ok(())
    }

    /// Tear the overlay down. A running capture session is left alone.
    pub fn stop_floating_recorder(&self) {
        let handle = self.overlay.lock().take();
        if let Some(mut handle) = handle {
            handle.shutdown();
            log::info!("Floating recorder stopped");
        }
    }

    /// Forward an input to the overlay. Returns false if no overlay is running.
    pub fn send_overlay_input(&self, input: OverlayInput) -> bool {
        self.overlay.lock().as_ref().is_some_and(|handle| handle.send(input))
    }

    /// Tell the overlay that the start it asked for did not happen.
    pub fn report_capture_failed(&self) -> bool {
        self.send_overlay_input(OverlayInput::CaptureFailed)
    }

    pub fn overlay_snapshot(&self) -> Option<OverlaySnapshot> {
        self.overlay.lock().as_ref().map(OverlayHandle::snapshot)
    }

    pub fn is_overlay_running(&self) -> bool {
        self.overlay.lock().as_ref().is_some_and(OverlayHandle::is_running)
    }

    // -- Host channel --

    pub fn attach_host(&self, channel: Arc<dyn HostChannel>) {
        if self.bridge.register(channel).is_some() {
            log::debug!("Host channel replaced");
        }
    }

    pub fn detach_host(&self) {
        self.bridge.unregister();
    }

    /// Dispatch an argument-free method call by name.
    pub fn handle_method_call(&self, method: &str) -> Result<Value, PluginError> {
        match method {
            "stopRecord" => {
                let path = self.stop_record()?;
                Ok(json!(path.map(|p| p.to_string_lossy().to_string())))
            }
            "listRecordings" => {
                let recordings = self.list_recordings()?;
                serde_json::to_value(recordings)
                    .map_err(|e| PluginError::ListFailed(CaptureError::Unknown(e.to_string())))
            }
            "stopFloatingRecorder" => {
                self.stop_floating_recorder();
                Ok(Value::Bool(true))
            }
            other => Err(PluginError::NotImplemented(other.to_string())),
        }
    }
}

impl Drop for RecorderPlugin {
    fn drop(&mut self) {
        self.stop_floating_recorder();
        self.bridge.unregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_source::ToneGrant;
    use crate::environment::HeadlessEnvironment;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Weak;
    use std::thread;
    use std::time::{Duration, Instant};
    use sysaudio_recorder_core::{OverlayDisplay, OverlayState, RecorderEvent};

    struct NullSurface;

    impl OverlaySurface for NullSurface {
        fn render(&mut self, _display: &OverlayDisplay) {}
        fn open_recordings(&mut self) {}
        fn dismiss(&mut self) {}
    }

    #[derive(Default)]
    struct DeniedEnvironment {
        requests: AtomicUsize,
        backgrounded: AtomicUsize,
    }

    impl HostEnvironment for DeniedEnvironment {
        fn can_draw_overlays(&self) -> bool {
            false
        }

        fn request_overlay_permission(&self) {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }

        fn move_to_background(&self) {
            self.backgrounded.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config(dir: &tempfile::TempDir) -> RecorderConfig {
        let mut config = RecorderConfig::default();
        config.capture.output_directory = dir.path().join("recordings");
        config.overlay = OverlayTiming {
            tick_interval_ms: 10,
            settle_delay_ms: 20,
        };
        config
    }

    fn plugin(dir: &tempfile::TempDir) -> RecorderPlugin {
        RecorderPlugin::new(config(dir), Arc::new(HeadlessEnvironment::default())).unwrap()
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn start_without_grant_is_no_projection() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = plugin(&dir);
        let err = plugin.start_record(None).unwrap_err();
        assert_eq!(err.code(), "NO_PROJECTION");
        assert!(!plugin.is_recording());
    }

    #[test]
    fn record_then_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = plugin(&dir);

        let first = plugin.start_record(Some(ToneGrant::handle(440.0))).unwrap();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(plugin.stop_record().unwrap(), Some(first.clone()));

        thread::sleep(Duration::from_millis(20));
        let second = plugin.start_record(Some(ToneGrant::handle(880.0))).unwrap();
        assert_ne!(first, second);
        thread::sleep(Duration::from_millis(60));
        plugin.stop_record().unwrap();

        let recordings = plugin.list_recordings().unwrap();
        assert_eq!(recordings.len(), 2);
        assert_eq!(recordings[0].path, second);
        assert!(recordings.iter().all(|r| r.size > 0 && r.name.ends_with(".pcm")));
    }

    #[test]
    fn stop_without_session_returns_last_path() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = plugin(&dir);
        assert_eq!(plugin.stop_record().unwrap(), None);

        let path = plugin.start_record(Some(ToneGrant::handle(440.0))).unwrap();
        plugin.stop_record().unwrap();
        assert_eq!(plugin.stop_record().unwrap(), Some(path));
    }

    #[test]
    fn list_on_fresh_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = plugin(&dir);
        assert_eq!(plugin.handle_method_call("listRecordings").unwrap(), json!([]));
    }

    #[test]
    fn method_calls_dispatch_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = plugin(&dir);

        let path = plugin.start_record(Some(ToneGrant::handle(440.0))).unwrap();
        let stopped = plugin.handle_method_call("stopRecord").unwrap();
        assert_eq!(stopped, json!(path.to_string_lossy()));

        let listed = plugin.handle_method_call("listRecordings").unwrap();
        assert_eq!(listed[0]["path"], json!(path.to_string_lossy()));
        assert!(listed[0]["lastModified"].is_i64());

        assert_eq!(plugin.handle_method_call("stopFloatingRecorder").unwrap(), json!(true));
        let err = plugin.handle_method_call("pauseRecord").unwrap_err();
        assert_eq!(err.payload().code, "NOT_IMPLEMENTED");
    }

    #[test]
    fn overlay_requires_permission() {
        let dir = tempfile::tempdir().unwrap();
        let environment = Arc::new(DeniedEnvironment::default());
        let plugin = RecorderPlugin::new(config(&dir), environment.clone()).unwrap();

        let err = plugin.start_floating_recorder(Box::new(NullSurface)).unwrap_err();
        assert_eq!(err.code(), "NO_PERMISSION");
        assert_eq!(environment.requests.load(Ordering::SeqCst), 1);
        assert_eq!(environment.backgrounded.load(Ordering::SeqCst), 0);
        assert!(!plugin.is_overlay_running());
    }

    #[test]
    fn second_overlay_start_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = plugin(&dir);

        plugin.start_floating_recorder(Box::new(NullSurface)).unwrap();
        assert!(plugin.send_overlay_input(OverlayInput::StartPressed));
        assert!(wait_for(|| plugin.overlay_snapshot().is_some_and(|s| s.state.is_recording())));

        plugin.start_floating_recorder(Box::new(NullSurface)).unwrap();
        assert!(plugin.overlay_snapshot().unwrap().state.is_recording());

        plugin.stop_floating_recorder();
        assert!(!plugin.is_overlay_running());
        assert!(!plugin.send_overlay_input(OverlayInput::StopPressed));
    }

    #[test]
    fn capture_failure_reverts_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = plugin(&dir);
        assert!(!plugin.report_capture_failed());

        plugin.start_floating_recorder(Box::new(NullSurface)).unwrap();
        plugin.send_overlay_input(OverlayInput::StartPressed);
        assert!(wait_for(|| plugin.overlay_snapshot().is_some_and(|s| s.state.is_recording())));

        assert!(plugin.report_capture_failed());
        assert!(wait_for(|| plugin.overlay_snapshot() == Some(OverlaySnapshot::default())));
    }

    #[test]
    fn overlay_buttons_drive_capture_through_host() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = Arc::new(plugin(&dir));

        let weak: Weak<RecorderPlugin> = Arc::downgrade(&plugin);
        plugin.attach_host(Arc::new(move |event: RecorderEvent| -> Result<(), String> {
            let plugin = weak.upgrade().ok_or("plugin gone")?;
            match event {
                RecorderEvent::Start => plugin
                    .start_record(Some(ToneGrant::handle(440.0)))
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                RecorderEvent::Stop => plugin.stop_record().map(|_| ()).map_err(|e| e.to_string()),
            }
        }));

        plugin.start_floating_recorder(Box::new(NullSurface)).unwrap();
        plugin.send_overlay_input(OverlayInput::StartPressed);
        assert!(wait_for(|| plugin.is_recording()));

        thread::sleep(Duration::from_millis(50));
        plugin.send_overlay_input(OverlayInput::StopPressed);
        assert!(wait_for(|| !plugin.is_recording()));
        assert!(wait_for(|| plugin.overlay_snapshot().map(|s| s.state)
            == Some(OverlayState::Confirming { panel_visible: true })));

        let recordings = plugin.list_recordings().unwrap();
        assert_eq!(recordings.len(), 1);
        assert!(recordings[0].size > 0);

        plugin.send_overlay_input(OverlayInput::ConfirmAccepted);
        assert!(wait_for(|| !plugin.is_overlay_running()));
        plugin.detach_host();
    }

    #[test]
    fn failed_start_does_not_finalize_previous_recording() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = Arc::new(plugin(&dir));
        let previous = plugin.start_record(Some(ToneGrant::handle(440.0))).unwrap();
        plugin.stop_record().unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let weak: Weak<RecorderPlugin> = Arc::downgrade(&plugin);
        plugin.attach_host(Arc::new(move |event: RecorderEvent| -> Result<(), String> {
            let plugin = weak.upgrade().ok_or("plugin gone")?;
            match event {
                RecorderEvent::Start => {
                    let err = plugin.start_record(Some(ToneGrant::handle(0.0))).unwrap_err();
                    log.lock().push(format!("start failed: {}", err.code()));
                    plugin.report_capture_failed();
                    Err(err.to_string())
                }
                RecorderEvent::Stop => {
                    let path = plugin.stop_record().map_err(|e| e.to_string())?;
                    log.lock().push(format!("stop -> {:?}", path));
                    Ok(())
                }
            }
        }));

        plugin.start_floating_recorder(Box::new(NullSurface)).unwrap();
        plugin.send_overlay_input(OverlayInput::StartPressed);
        assert!(wait_for(|| !seen.lock().is_empty()
            && plugin.overlay_snapshot() == Some(OverlaySnapshot::default())));
        thread::sleep(Duration::from_millis(50));

        assert_eq!(*seen.lock(), vec!["start failed: START_FAILED".to_string()]);
        assert!(!plugin.is_recording());
        assert_eq!(plugin.list_recordings().unwrap().len(), 1);
        assert_eq!(plugin.stop_record().unwrap(), Some(previous));

        plugin.stop_floating_recorder();
        plugin.detach_host();
    }
}
