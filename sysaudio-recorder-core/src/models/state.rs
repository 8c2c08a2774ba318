/// Logical state of the floating overlay.
///
/// State transitions:
/// ```text
/// idle ──start──→ recording ──stop──→ confirming ──decline──→ idle
///   │                 │                    │
///   └──close──→ dismissed ←──accept────────┘
/// ```
/// Any state moves to `Dismissed` when the surface is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    Idle,
    Recording,
    /// Waiting for the user's answer. The panel stays hidden until the
    /// settle delay has elapsed.
    Confirming { panel_visible: bool },
    /// Terminal: the surface has been torn down.
    Dismissed,
}

impl OverlayState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_confirming(&self) -> bool {
        matches!(self, Self::Confirming { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Dismissed)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Confirming { .. } => "confirming",
            Self::Dismissed => "dismissed",
        }
    }
}

/// Point-in-time view of the overlay, readable from outside the UI context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlaySnapshot {
    pub state: OverlayState,
    pub elapsed_seconds: u32,
}
