use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::Mutex;

use crate::models::state::OverlaySnapshot;
use crate::overlay::machine::{OverlayInput, OverlayStateMachine};
use crate::traits::overlay_surface::OverlaySurface;

/// Runs an [`OverlayStateMachine`] on its own UI-context thread.
///
/// Inputs arrive over a channel. Scheduled continuations wait in a deadline
/// list and are delivered by timing out the channel receive, so the loop
/// never sleeps past an incoming press.
pub struct OverlayDriver {
    machine: OverlayStateMachine,
    surface: Box<dyn OverlaySurface>,
    inputs: Receiver<OverlayInput>,
    timers: Vec<(Instant, OverlayInput)>,
    snapshot: Arc<Mutex<OverlaySnapshot>>,
}

impl OverlayDriver {
    pub fn spawn(machine: OverlayStateMachine, surface: Box<dyn OverlaySurface>) -> io::Result<OverlayHandle> {
        let (tx, rx) = mpsc::channel();
        let snapshot = Arc::new(Mutex::new(machine.snapshot()));
        let driver = Self {
            machine,
            surface,
            inputs: rx,
            timers: Vec::new(),
            snapshot: Arc::clone(&snapshot),
        };

        let thread = thread::Builder::new()
            .name("overlay-ui".into())
            .spawn(move || driver.run())?;

        Ok(OverlayHandle {
            inputs: tx,
            snapshot,
            thread: Some(thread),
        })
    }

    fn run(mut self) {
        self.machine.attach(self.surface.as_mut());
        while !self.machine.state().is_terminal() {
            // A vanished handle means nobody can drive the overlay anymore.
            let input = self.next_input().unwrap_or(OverlayInput::SurfaceDestroyed);
            if let Some(scheduled) = self.machine.handle(input, self.surface.as_mut()) {
                self.timers.push((Instant::now() + scheduled.delay, scheduled.input));
            }
            *self.snapshot.lock() = self.machine.snapshot();
        }
        log::debug!("Overlay UI loop exited");
    }

    fn next_input(&mut self) -> Option<OverlayInput> {
        loop {
            let due = self
                .timers
                .iter()
                .enumerate()
                .min_by_key(|(_, (at, _))| *at)
                .map(|(index, (at, _))| (index, *at));

            let Some((index, at)) = due else {
                return self.inputs.recv().ok();
            };

            let now = Instant::now();
            if at <= now {
                return Some(self.timers.swap_remove(index).1);
            }
            match self.inputs.recv_timeout(at - now) {
                Ok(input) => return Some(input),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

/// Caller-side handle to a running overlay.
///
/// Dropping the handle tears the overlay down.
pub struct OverlayHandle {
    inputs: Sender<OverlayInput>,
    snapshot: Arc<Mutex<OverlaySnapshot>>,
    thread: Option<JoinHandle<()>>,
}

impl OverlayHandle {
    /// Queue `input` for the UI context. Returns false once the overlay has exited.
    pub fn send(&self, input: OverlayInput) -> bool {
        self.inputs.send(input).is_ok()
    }

    pub fn press_start(&self) -> bool {
        self.send(OverlayInput::StartPressed)
    }

    pub fn press_stop(&self) -> bool {
        self.send(OverlayInput::StopPressed)
    }

    pub fn accept_confirm(&self) -> bool {
        self.send(OverlayInput::ConfirmAccepted)
    }

    pub fn decline_confirm(&self) -> bool {
        self.send(OverlayInput::ConfirmDeclined)
    }

    pub fn report_capture_failed(&self) -> bool {
        self.send(OverlayInput::CaptureFailed)
    }

    pub fn snapshot(&self) -> OverlaySnapshot {
        *self.snapshot.lock()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Destroy the surface and wait for the UI context to exit.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.inputs.send(OverlayInput::SurfaceDestroyed);
        // Dropped from a host callback on the UI thread itself; the loop
        // exits on its own once the callback returns.
        if thread.thread().id() == thread::current().id() {
            return;
        }
        if thread.join().is_err() {
            log::error!("Overlay UI thread panicked");
        }
    }
}

impl Drop for OverlayHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
