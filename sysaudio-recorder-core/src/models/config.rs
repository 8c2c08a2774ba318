use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::format::PcmFormat;

/// Configuration for the capture session controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfiguration {
    /// Directory where recording files are written.
    pub output_directory: PathBuf,

    /// PCM layout requested from the capture source (default: 16-bit 44.1 kHz stereo).
    pub format: PcmFormat,

    /// File name prefix, followed by the capture timestamp in milliseconds.
    pub file_prefix: String,

    /// File extension without the leading dot (default: `pcm`).
    pub file_extension: String,

    /// Bounded wait for the worker to exit on `stop` (default: 1000 ms).
    pub stop_join_timeout_ms: u64,

    /// Bounded wait for a stale worker during forced reset (default: 500 ms).
    pub reset_join_timeout_ms: u64,
}

impl CaptureConfiguration {
    pub fn with_output_directory(output_directory: impl Into<PathBuf>) -> Self {
        Self {
            output_directory: output_directory.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.format.validate()?;
        if self.file_extension.is_empty() || self.file_extension.contains('.') {
            return Err(format!("invalid file extension: {:?}", self.file_extension));
        }
        if self.stop_join_timeout_ms == 0 || self.reset_join_timeout_ms == 0 {
            return Err("join timeouts must be positive".into());
        }
        Ok(())
    }

    pub fn stop_join_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_join_timeout_ms)
    }

    pub fn reset_join_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_join_timeout_ms)
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("."),
            format: PcmFormat::default(),
            file_prefix: "system_record_".into(),
            file_extension: "pcm".into(),
            stop_join_timeout_ms: 1000,
            reset_join_timeout_ms: 500,
        }
    }
}

/// Timing of the overlay's scheduled continuations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayTiming {
    /// Period of the elapsed-time tick while recording.
    pub tick_interval_ms: u64,

    /// Delay between the `"stop"` notification and revealing the confirm panel.
    pub settle_delay_ms: u64,
}

impl OverlayTiming {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for OverlayTiming {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            settle_delay_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = CaptureConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stop_join_timeout(), Duration::from_secs(1));
        assert_eq!(config.reset_join_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn rejects_bad_extension_and_zero_timeouts() {
        let dotted = CaptureConfiguration {
            file_extension: ".pcm".into(),
            ..Default::default()
        };
        assert!(dotted.validate().is_err());

        let zero = CaptureConfiguration {
            stop_join_timeout_ms: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: CaptureConfiguration =
            serde_json::from_str(r#"{"output_directory": "/tmp/rec", "format": {"channels": 1}}"#).unwrap();
        assert_eq!(config.output_directory, PathBuf::from("/tmp/rec"));
        assert_eq!(config.format.channels, 1);
        assert_eq!(config.format.sample_rate, 44_100);
        assert_eq!(config.file_extension, "pcm");
    }
}
