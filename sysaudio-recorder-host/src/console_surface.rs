use std::io::{self, Write};

use sysaudio_recorder_core::{OverlayDisplay, OverlaySurface, StopLabel};

/// Overlay surface that draws a one-line status to a writer.
pub struct ConsoleSurface<W: Write + Send> {
    out: W,
    last_line: Option<String>,
    dismissed: bool,
}

impl ConsoleSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_line: None,
            dismissed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            log::warn!("Overlay console write failed: {}", e);
        }
    }
}

/// One-line rendering of the overlay's visible controls.
pub fn render_line(display: &OverlayDisplay) -> String {
    let mut line = format!("[{}]", display.timer_text);
    if display.start_visible {
        line.push_str(if display.start_enabled { " (start)" } else { " (start: disabled)" });
    }
    if display.stop_visible {
        line.push_str(match display.stop_label {
            StopLabel::Stop => " (stop)",
            StopLabel::Close => " (close)",
        });
    }
    if display.confirm_panel_visible {
        line.push_str(" Open recordings? (yes/no)");
    }
    line
}

impl<W: Write + Send> OverlaySurface for ConsoleSurface<W> {
    fn render(&mut self, display: &OverlayDisplay) {
        let line = render_line(display);
        // Ticks re-render the whole display; only print what changed.
        if self.last_line.as_deref() != Some(line.as_str()) {
            self.emit(&line);
            self.last_line = Some(line);
        }
    }

    fn open_recordings(&mut self) {
        self.emit("-> opening recordings (type `list`)");
    }

    fn dismiss(&mut self) {
        if !self.dismissed {
            self.dismissed = true;
            self.emit("-> overlay closed");
        }
    }
}
