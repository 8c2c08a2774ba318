use std::any::Any;
use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::session::cancel::CancellationToken;
use crate::storage::sink::CaptureSink;
use crate::traits::capture_source::CaptureSource;

/// How often a bounded join checks whether the worker has exited.
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Counters collected by one drain loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub reads: u64,
    pub bytes_written: u64,
    pub read_errors: u64,
    pub write_errors: u64,
    /// Set when the loop ended on a fatal source error instead of cancellation.
    pub source_lost: bool,
}

/// Resources handed back by a worker that exited.
pub(crate) struct WorkerOutput {
    pub source: Box<dyn CaptureSource>,
    pub sink: CaptureSink,
    pub stats: DrainStats,
}

pub(crate) enum JoinOutcome {
    Finished(WorkerOutput),
    Panicked(String),
    /// Still running; the worker is handed back so the caller can retry.
    TimedOut(CaptureWorker),
}

/// Background thread draining one capture source into one sink.
///
/// The worker owns both for the lifetime of the drain and returns them on
/// exit, so the controller can only release them once the loop has stopped.
pub(crate) struct CaptureWorker {
    handle: JoinHandle<WorkerOutput>,
    token: CancellationToken,
}

impl CaptureWorker {
    pub fn spawn(
        session_id: Uuid,
        mut source: Box<dyn CaptureSource>,
        mut sink: CaptureSink,
        buffer_size: usize,
        token: CancellationToken,
    ) -> io::Result<Self> {
        let worker_token = token.clone();
        let handle = thread::Builder::new()
            .name("capture-worker".into())
            .spawn(move || {
                log::debug!("[{}] Capture worker started ({})", session_id, source.description());
                let stats = drain(source.as_mut(), &mut sink, buffer_size, &worker_token);
                log::debug!("[{}] Capture worker finished: {:?}", session_id, stats);
                WorkerOutput { source, sink, stats }
            })?;

        Ok(Self { handle, token })
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait up to `timeout` for the worker to exit.
    ///
    /// Dropping a timed-out worker detaches its thread; whatever it owns is
    /// dropped when its in-flight read finally returns.
    pub fn join(self, timeout: Duration) -> JoinOutcome {
        let deadline = Instant::now() + timeout;
        while !self.handle.is_finished() {
            let now = Instant::now();
            if now >= deadline {
                return JoinOutcome::TimedOut(self);
            }
            thread::sleep(JOIN_POLL_INTERVAL.min(deadline - now));
        }

        match self.handle.join() {
            Ok(output) => JoinOutcome::Finished(output),
            Err(payload) => JoinOutcome::Panicked(panic_message(payload.as_ref())),
        }
    }
}

/// Read fixed-size chunks from `source` into `sink` until `token` is cancelled.
///
/// Only the bytes actually read are written. Transient read or write errors
/// are logged and the loop carries on; a fatal source error ends it.
pub(crate) fn drain(
    source: &mut dyn CaptureSource,
    sink: &mut CaptureSink,
    buffer_size: usize,
    token: &CancellationToken,
) -> DrainStats {
    let mut stats = DrainStats::default();
    let mut buffer = vec![0u8; buffer_size];

    while !token.is_cancelled() {
        match source.read(&mut buffer) {
            Ok(0) => {}
            Ok(read) => {
                stats.reads += 1;
                let read = read.min(buffer.len());
                match sink.write(&buffer[..read]) {
                    Ok(()) => stats.bytes_written += read as u64,
                    Err(e) => {
                        stats.write_errors += 1;
                        log::error!("Failed to write audio data: {}", e);
                    }
                }
            }
            Err(e) if e.is_fatal() => {
                log::error!("Capture source failed, ending drain: {}", e);
                stats.source_lost = true;
                break;
            }
            Err(e) => {
                stats.read_errors += 1;
                log::warn!("Dropped one read: {}", e);
            }
        }
    }

    stats
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "worker panicked".to_string()
    }
}
