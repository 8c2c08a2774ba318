use std::sync::atomic::{AtomicBool, Ordering};

/// Host application hooks the plugin needs around the floating overlay.
pub trait HostEnvironment: Send + Sync {
    /// Whether the host may draw over other applications.
    fn can_draw_overlays(&self) -> bool;

    /// Send the user to the host's overlay permission screen.
    fn request_overlay_permission(&self);

    /// Move the host's own task out of the way once the overlay is up.
    fn move_to_background(&self);
}

/// Environment for desktop and headless hosts, where drawing an overlay
/// needs no grant.
#[derive(Debug)]
pub struct HeadlessEnvironment {
    overlay_allowed: AtomicBool,
}

impl HeadlessEnvironment {
    pub fn new(overlay_allowed: bool) -> Self {
        Self {
            overlay_allowed: AtomicBool::new(overlay_allowed),
        }
    }
}

impl Default for HeadlessEnvironment {
    fn default() -> Self {
        Self::new(true)
    }
}

impl HostEnvironment for HeadlessEnvironment {
    fn can_draw_overlays(&self) -> bool {
        self.overlay_allowed.load(Ordering::SeqCst)
    }

    fn request_overlay_permission(&self) {
        log::info!("Overlay permission requested; granting");
        self.overlay_allowed.store(true, Ordering::SeqCst);
    }

    fn move_to_background(&self) {
        log::debug!("Headless host has no window to background");
    }
}
