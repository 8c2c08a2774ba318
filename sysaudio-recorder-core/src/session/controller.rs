use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::config::CaptureConfiguration;
use crate::models::error::{CaptureError, StartError, StopError};
use crate::models::release::{ReleaseFailure, ReleaseReport, ReleaseStage};
use crate::session::cancel::CancellationToken;
use crate::session::worker::{CaptureWorker, DrainStats, JoinOutcome, WorkerOutput};
use crate::storage::sink::CaptureSink;
use crate::traits::capture_source::{CaptureHandle, CaptureSource, SourceControl};

/// One live capture: a worker draining a source into a sink.
struct Session {
    id: Uuid,
    worker: CaptureWorker,
    control: Arc<dyn SourceControl>,
    output_path: PathBuf,
    started_at: Instant,
}

/// A worker that outlived its teardown, still owning its source and sink.
struct Stranded {
    id: Uuid,
    worker: CaptureWorker,
    control: Arc<dyn SourceControl>,
}

/// Mutable controller state, only touched under the controller's lock.
///
/// `session` and `stranded` are never both set: `start` refuses to run
/// while a stranded worker is alive.
#[derive(Default)]
struct ControllerState {
    session: Option<Session>,
    stranded: Option<Stranded>,
    last_output_path: Option<PathBuf>,
}

/// Owns the system-wide capture session.
///
/// `start`, `stop`, and `forced_reset` run under a single lock, so a start
/// racing a stop can never leave two workers draining or leak a source.
/// Teardown of the previous session (cancel, bounded join, release, close)
/// always completes before a new session's resources are constructed.
///
/// ```text
/// [CaptureHandle] → open source ─┐
///                                ├→ [CaptureWorker thread] → read → write → [CaptureSink]
/// [output dir] → timestamped sink┘
/// ```
pub struct SessionController {
    config: CaptureConfiguration,
    state: Mutex<ControllerState>,
}

impl SessionController {
    pub fn new(config: CaptureConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            config,
            state: Mutex::new(ControllerState::default()),
        })
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    /// Start a new capture session, returning the path it records to.
    ///
    /// Any stale session is force-reset first. On failure nothing is left
    /// running: an opened source is released and a created file is removed.
    pub fn start(&self, handle: CaptureHandle) -> Result<PathBuf, StartError> {
        let mut state = self.state.lock();
        self.reset_locked(&mut state);
        if state.stranded.is_some() {
            log::error!("Refusing start: previous capture worker still holds its source");
            return Err(StartError::WorkerStillRunning);
        }

        if !handle.is_valid() {
            log::warn!("Rejecting start: capture grant is missing or expired");
            return Err(StartError::GrantInvalid);
        }

        let format = self.config.format;
        let buffer_size = format.min_buffer_size();

        let mut source = handle.open_source(&format, buffer_size).map_err(|e| {
            log::error!("Failed to open capture source: {}", e);
            StartError::SourceUnavailable(e)
        })?;

        let sink = match CaptureSink::create_timestamped(
            &self.config.output_directory,
            &self.config.file_prefix,
            &self.config.file_extension,
            Utc::now(),
        ) {
            Ok(sink) => sink,
            Err(e) => {
                log::error!("Failed to create output file: {}", e);
                release_quietly(source.as_mut());
                return Err(StartError::SinkUnavailable(e));
            }
        };

        if let Err(e) = source.start() {
            log::error!("Failed to start capture source: {}", e);
            release_quietly(source.as_mut());
            sink.discard();
            return Err(StartError::SourceUnavailable(e));
        }

        let id = Uuid::new_v4();
        let output_path = sink.file_path().to_path_buf();
        let description = source.description();
        let control = source.control();

        let worker = match CaptureWorker::spawn(id, source, sink, buffer_size, CancellationToken::new()) {
            Ok(worker) => worker,
            Err(e) => {
                // The source and sink went down with the unspawned closure.
                log::error!("Failed to spawn capture worker: {}", e);
                let _ = fs::remove_file(&output_path);
                return Err(StartError::WorkerSpawnFailed(e.to_string()));
            }
        };

        log::info!(
            "[{}] Recording started: {} ({}, {} from {}, {} byte reads)",
            id,
            output_path.display(),
            format,
            self.config.file_extension,
            description,
            buffer_size
        );

        state.session = Some(Session {
            id,
            worker,
            control,
            output_path: output_path.clone(),
            started_at: Instant::now(),
        });
        state.last_output_path = Some(output_path.clone());
        Ok(output_path)
    }

    /// Stop the active session and return its finalized output path.
    ///
    /// With nothing to stop this succeeds with the last known path (`None`
    /// before the first session) and changes nothing. Waits at most the
    /// configured stop timeout for the worker to exit, then releases the
    /// device underneath it and waits once more.
    pub fn stop(&self) -> Result<Option<PathBuf>, StopError> {
        let mut state = self.state.lock();
        let Some(session) = state.session.take() else {
            log::warn!("stop called but not recording");
            return Ok(state.last_output_path.clone());
        };

        let path = session.output_path.clone();
        let (report, stranded) = teardown(session, self.config.stop_join_timeout());
        state.stranded = stranded;
        state.last_output_path = Some(path.clone());

        if report.is_clean() {
            log::info!("Recording stopped, file: {}", path.display());
            Ok(Some(path))
        } else {
            log::warn!("Recording stopped with release failures ({}): {}", path.display(), report);
            Err(StopError::ReleaseFailed { path, report })
        }
    }

    /// Tear down any session, swallowing release failures.
    ///
    /// Idempotent. The returned report lists what went wrong so callers and
    /// tests can observe it; nothing in it is propagated.
    pub fn forced_reset(&self) -> ReleaseReport {
        let mut state = self.state.lock();
        self.reset_locked(&mut state)
    }

    /// Whether a session exists and its worker is still draining.
    pub fn is_active(&self) -> bool {
        self.state
            .lock()
            .session
            .as_ref()
            .is_some_and(|session| !session.worker.is_finished())
    }

    /// Output path of the current session, if any.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.state.lock().session.as_ref().map(|s| s.output_path.clone())
    }

    /// Output path of the most recent session, active or not.
    pub fn last_output_path(&self) -> Option<PathBuf> {
        self.state.lock().last_output_path.clone()
    }

    fn reset_locked(&self, state: &mut ControllerState) -> ReleaseReport {
        let report = reset(state, self.config.reset_join_timeout());
        for failure in report.failures() {
            log::warn!("Ignoring {} failure during reset: {}", failure.stage, failure.message);
        }
        report
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let timeout = self.config.reset_join_timeout();
        let state = self.state.get_mut();
        let report = reset(state, timeout);
        for failure in report.failures() {
            log::warn!("{} failure while dropping controller: {}", failure.stage, failure.message);
        }
        if let Some(stranded) = state.stranded.take() {
            log::error!("[{}] Detaching capture worker that never exited", stranded.id);
        }
    }
}

/// Tear down the current session, or retry a stranded worker if there is none.
fn reset(state: &mut ControllerState, join_timeout: Duration) -> ReleaseReport {
    if let Some(session) = state.session.take() {
        log::warn!("[{}] Forcing reset of session", session.id);
        let (report, stranded) = teardown(session, join_timeout);
        state.stranded = stranded;
        return report;
    }

    let mut report = ReleaseReport::default();
    if let Some(stranded) = state.stranded.take() {
        state.stranded = reap(stranded, join_timeout, &mut report);
    }
    report
}

/// Cancel, join (bounded), release the source, close the sink.
///
/// Every step runs even when an earlier one fails. A worker that misses the
/// deadline has its device released underneath it through the source's
/// control and gets one more bounded wait; if it still has not exited it is
/// returned as stranded.
fn teardown(session: Session, join_timeout: Duration) -> (ReleaseReport, Option<Stranded>) {
    let Session {
        id,
        worker,
        control,
        output_path,
        started_at,
    } = session;
    let mut report = ReleaseReport::for_session(output_path);

    worker.cancel();
    let outcome = match worker.join(join_timeout) {
        JoinOutcome::TimedOut(worker) => {
            log::warn!(
                "[{}] Capture worker did not exit within {} ms, releasing its source",
                id,
                join_timeout.as_millis()
            );
            report.record(ReleaseStage::SourceInterrupt, control.release());
            worker.join(join_timeout)
        }
        outcome => outcome,
    };

    match outcome {
        JoinOutcome::Finished(output) => {
            let stats = release_output(output, &mut report);
            log::info!(
                "[{}] Session ended after {:.1}s: {} bytes in {} reads ({} read errors, {} write errors{})",
                id,
                started_at.elapsed().as_secs_f64(),
                stats.bytes_written,
                stats.reads,
                stats.read_errors,
                stats.write_errors,
                if stats.source_lost { ", source lost" } else { "" }
            );
            (report, None)
        }
        JoinOutcome::Panicked(message) => {
            log::error!("[{}] Capture worker panicked: {}", id, message);
            report.push(ReleaseFailure::new(ReleaseStage::WorkerPanicked, message));
            (report, None)
        }
        JoinOutcome::TimedOut(worker) => {
            log::error!("[{}] Capture worker still running after its source was released", id);
            report.push(ReleaseFailure::new(
                ReleaseStage::WorkerJoin,
                format!("worker did not exit within {} ms", 2 * join_timeout.as_millis()),
            ));
            (report, Some(Stranded { id, worker, control }))
        }
    }
}

/// Retry a stranded worker: release its device again and wait once more.
fn reap(stranded: Stranded, join_timeout: Duration, report: &mut ReleaseReport) -> Option<Stranded> {
    let Stranded { id, worker, control } = stranded;
    if let Err(e) = control.release() {
        log::debug!("[{}] Stranded source release failed again: {}", id, e);
    }

    match worker.join(join_timeout) {
        JoinOutcome::Finished(output) => {
            let stats = release_output(output, report);
            log::info!("[{}] Stranded capture worker exited after {} reads", id, stats.reads);
            None
        }
        JoinOutcome::Panicked(message) => {
            log::error!("[{}] Stranded capture worker panicked: {}", id, message);
            report.push(ReleaseFailure::new(ReleaseStage::WorkerPanicked, message));
            None
        }
        JoinOutcome::TimedOut(worker) => {
            report.push(ReleaseFailure::new(
                ReleaseStage::WorkerJoin,
                format!("previous worker still running after {} ms", join_timeout.as_millis()),
            ));
            Some(Stranded { id, worker, control })
        }
    }
}

/// Stop and release the source a finished worker handed back, then close its sink.
fn release_output(output: WorkerOutput, report: &mut ReleaseReport) -> DrainStats {
    let WorkerOutput {
        mut source,
        mut sink,
        stats,
    } = output;
    report.record(ReleaseStage::SourceStop, source.stop());
    report.record(ReleaseStage::SourceRelease, source.release());
    report.record(ReleaseStage::SinkClose, sink.close());
    stats
}

fn release_quietly(source: &mut dyn CaptureSource) {
    if let Err(e) = source.release() {
        log::warn!("Failed to release capture source: {}", e);
    }
}
