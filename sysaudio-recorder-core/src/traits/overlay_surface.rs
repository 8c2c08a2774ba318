use crate::overlay::display::OverlayDisplay;

/// The rendered floating control surface.
///
/// Layout, drawing, and drag handling live behind this trait; the state
/// machine only pushes a display model and asks for navigation or teardown.
/// All methods are called on the overlay's UI context.
pub trait OverlaySurface: Send {
    /// Apply the derived display fields.
    fn render(&mut self, display: &OverlayDisplay);

    /// Bring the host to the foreground on its recordings view.
    fn open_recordings(&mut self);

    /// Tear the surface down and release its UI resources. May be called
    /// more than once.
    fn dismiss(&mut self);
}
