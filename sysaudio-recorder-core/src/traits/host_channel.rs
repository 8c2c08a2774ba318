use crate::models::event::RecorderEvent;

/// The host application's end of the event bridge.
///
/// Called from the overlay's UI context. A delivery failure is logged by the
/// bridge and otherwise ignored.
pub trait HostChannel: Send + Sync {
    fn deliver(&self, event: RecorderEvent) -> Result<(), String>;
}

impl<F> HostChannel for F
where
    F: Fn(RecorderEvent) -> Result<(), String> + Send + Sync,
{
    fn deliver(&self, event: RecorderEvent) -> Result<(), String> {
        self(event)
    }
}
