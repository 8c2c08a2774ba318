use std::sync::Arc;
use std::time::Duration;

use crate::bridge::event_bridge::EventBridge;
use crate::models::config::OverlayTiming;
use crate::models::event::RecorderEvent;
use crate::models::state::{OverlaySnapshot, OverlayState};
use crate::overlay::display::OverlayDisplay;
use crate::traits::overlay_surface::OverlaySurface;

/// Kind of scheduled continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// One-second elapsed-time tick while recording.
    Tick,
    /// Settle delay before the confirm panel is revealed.
    Settle,
}

/// Everything the overlay reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayInput {
    StartPressed,
    /// The stop button, which reads "close" when nothing is recording.
    StopPressed,
    ConfirmAccepted,
    ConfirmDeclined,
    /// The host could not start capture after the `"start"` notification.
    /// No session exists, so the overlay reverts without a `"stop"`.
    CaptureFailed,
    /// A scheduled continuation fired. Ignored unless `generation` is current.
    Timer { kind: TimerKind, generation: u64 },
    SurfaceDestroyed,
}

/// A continuation the caller must deliver back after `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    pub delay: Duration,
    pub input: OverlayInput,
}

/// Drives the floating control surface: idle → recording → confirming.
///
/// The machine never sleeps or blocks. Timed behaviour is returned as a
/// [`Scheduled`] continuation; bumping `generation` cancels every
/// continuation issued before it.
pub struct OverlayStateMachine {
    state: OverlayState,
    elapsed_seconds: u32,
    generation: u64,
    timing: OverlayTiming,
    bridge: Arc<EventBridge>,
}

impl OverlayStateMachine {
    pub fn new(bridge: Arc<EventBridge>, timing: OverlayTiming) -> Self {
        Self {
            state: OverlayState::Idle,
            elapsed_seconds: 0,
            generation: 0,
            timing,
            bridge,
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn snapshot(&self) -> OverlaySnapshot {
        OverlaySnapshot {
            state: self.state,
            elapsed_seconds: self.elapsed_seconds,
        }
    }

    pub fn display(&self) -> OverlayDisplay {
        OverlayDisplay::derive(self.state, self.elapsed_seconds)
    }

    /// Render the initial display onto a freshly created surface.
    pub fn attach(&self, surface: &mut dyn OverlaySurface) {
        surface.render(&self.display());
    }

    /// Apply one input. Returns the continuation to schedule, if any.
    pub fn handle(&mut self, input: OverlayInput, surface: &mut dyn OverlaySurface) -> Option<Scheduled> {
        match (self.state, input) {
            (OverlayState::Dismissed, _) => None,

            (_, OverlayInput::SurfaceDestroyed) => {
                log::debug!("Overlay surface destroyed while {}", self.state.as_str());
                self.dismiss(surface);
                None
            }

            (OverlayState::Idle, OverlayInput::StartPressed) => {
                self.state = OverlayState::Recording;
                self.elapsed_seconds = 0;
                let generation = self.bump_generation();
                log::info!("Overlay recording started");
                self.bridge.notify(RecorderEvent::Start);
                surface.render(&self.display());
                Some(self.schedule(TimerKind::Tick, generation))
            }

            (OverlayState::Idle, OverlayInput::StopPressed) => {
                log::debug!("Overlay closed from idle");
                self.dismiss(surface);
                None
            }

            (OverlayState::Recording, OverlayInput::Timer { kind: TimerKind::Tick, generation })
                if generation == self.generation =>
            {
                self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
                surface.render(&self.display());
                Some(self.schedule(TimerKind::Tick, generation))
            }

            (OverlayState::Recording, OverlayInput::StopPressed) => {
                self.state = OverlayState::Confirming { panel_visible: false };
                let generation = self.bump_generation();
                log::info!("Overlay recording stopped after {}s", self.elapsed_seconds);
                // The host starts finalizing on this event; the panel waits for the settle delay.
                self.bridge.notify(RecorderEvent::Stop);
                surface.render(&self.display());
                Some(self.schedule(TimerKind::Settle, generation))
            }

            (OverlayState::Recording, OverlayInput::CaptureFailed) => {
                log::warn!("Host failed to start capture, returning overlay to idle");
                self.state = OverlayState::Idle;
                self.elapsed_seconds = 0;
                self.bump_generation();
                surface.render(&self.display());
                None
            }

            (
                OverlayState::Confirming { panel_visible: false },
                OverlayInput::Timer { kind: TimerKind::Settle, generation },
            ) if generation == self.generation => {
                self.state = OverlayState::Confirming { panel_visible: true };
                surface.render(&self.display());
                None
            }

            (OverlayState::Confirming { panel_visible: true }, OverlayInput::ConfirmAccepted) => {
                log::debug!("Opening recordings view");
                surface.open_recordings();
                self.dismiss(surface);
                None
            }

            (OverlayState::Confirming { panel_visible: true }, OverlayInput::ConfirmDeclined) => {
                self.state = OverlayState::Idle;
                self.elapsed_seconds = 0;
                surface.render(&self.display());
                None
            }

            (state, input) => {
                log::trace!("Overlay ignoring {:?} while {}", input, state.as_str());
                None
            }
        }
    }

    fn dismiss(&mut self, surface: &mut dyn OverlaySurface) {
        self.state = OverlayState::Dismissed;
        self.bump_generation();
        surface.dismiss();
    }

    fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn schedule(&self, kind: TimerKind, generation: u64) -> Scheduled {
        let delay = match kind {
            TimerKind::Tick => self.timing.tick_interval(),
            TimerKind::Settle => self.timing.settle_delay(),
        };
        Scheduled {
            delay,
            input: OverlayInput::Timer { kind, generation },
        }
    }
}
