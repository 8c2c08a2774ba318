use crate::models::state::OverlayState;

/// Label shown on the stop button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopLabel {
    /// Ends the running recording.
    Stop,
    /// Closes the overlay when nothing is recording.
    Close,
}

/// Display fields derived from the overlay state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayDisplay {
    pub timer_text: String,
    pub start_visible: bool,
    pub start_enabled: bool,
    pub stop_visible: bool,
    pub stop_label: StopLabel,
    pub confirm_panel_visible: bool,
}

impl OverlayDisplay {
    pub fn derive(state: OverlayState, elapsed_seconds: u32) -> Self {
        match state {
            OverlayState::Idle => Self {
                timer_text: format_elapsed(0),
                start_visible: true,
                start_enabled: true,
                stop_visible: true,
                stop_label: StopLabel::Close,
                confirm_panel_visible: false,
            },
            OverlayState::Recording => Self {
                timer_text: format_elapsed(elapsed_seconds),
                start_visible: true,
                start_enabled: false,
                stop_visible: true,
                stop_label: StopLabel::Stop,
                confirm_panel_visible: false,
            },
            OverlayState::Confirming { panel_visible } => Self {
                timer_text: format_elapsed(elapsed_seconds),
                start_visible: false,
                start_enabled: false,
                stop_visible: false,
                stop_label: StopLabel::Stop,
                confirm_panel_visible: panel_visible,
            },
            OverlayState::Dismissed => Self {
                timer_text: format_elapsed(0),
                start_visible: false,
                start_enabled: false,
                stop_visible: false,
                stop_label: StopLabel::Close,
                confirm_panel_visible: false,
            },
        }
    }
}

/// `mm:ss`, with minutes growing past two digits for long recordings.
pub fn format_elapsed(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
