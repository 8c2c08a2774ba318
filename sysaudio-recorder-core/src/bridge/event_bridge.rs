use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::event::RecorderEvent;
use crate::traits::host_channel::HostChannel;

/// Registry holding at most one host channel.
///
/// Owned by the composition root and shared with the overlay. Registering a
/// channel replaces the previous one atomically. `notify` never fails: with
/// no channel attached, or when delivery fails, the event is dropped.
#[derive(Default)]
pub struct EventBridge {
    channel: RwLock<Option<Arc<dyn HostChannel>>>,
}

impl EventBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach `channel`, returning whichever channel it superseded.
    pub fn register(&self, channel: Arc<dyn HostChannel>) -> Option<Arc<dyn HostChannel>> {
        let previous = self.channel.write().replace(channel);
        log::debug!(
            "Host channel registered{}",
            if previous.is_some() { " (replaced previous)" } else { "" }
        );
        previous
    }

    /// Detach the current channel, if any.
    pub fn unregister(&self) -> Option<Arc<dyn HostChannel>> {
        let previous = self.channel.write().take();
        if previous.is_some() {
            log::debug!("Host channel unregistered");
        }
        previous
    }

    pub fn is_registered(&self) -> bool {
        self.channel.read().is_some()
    }

    /// Fire-and-forget delivery of `event` to the registered channel.
    pub fn notify(&self, event: RecorderEvent) {
        // Clone out of the lock so a channel may re-register from inside `deliver`.
        let channel = self.channel.read().clone();
        let Some(channel) = channel else {
            log::debug!("No host channel registered, dropping {:?} event", event);
            return;
        };
        if let Err(e) = channel.deliver(event) {
            log::warn!("Failed to deliver {:?} event to host: {}", event, e);
        }
    }
}
