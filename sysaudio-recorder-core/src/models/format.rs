use std::fmt;

use serde::{Deserialize, Serialize};

/// Duration covered by the smallest read buffer the worker will use.
const MIN_BUFFER_MILLIS: u32 = 20;

/// Layout of the raw PCM stream written to disk.
///
/// Samples are little-endian, channel-interleaved, with no file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl PcmFormat {
    /// 16-bit, 44.1 kHz, stereo.
    pub const CD_STEREO: Self = Self {
        sample_rate: 44_100,
        channels: 2,
        bit_depth: 16,
    };

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.bit_depth != 16 {
            return Err(format!("unsupported bit depth: {}", self.bit_depth));
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        Ok(())
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * (self.bit_depth as usize / 8)
    }

    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.bytes_per_frame()
    }

    /// Smallest read buffer for this format, always a whole number of frames.
    pub fn min_buffer_size(&self) -> usize {
        let frames = (self.sample_rate as usize * MIN_BUFFER_MILLIS as usize / 1000).max(1);
        frames * self.bytes_per_frame()
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::CD_STEREO
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = match self.channels {
            1 => "mono",
            2 => "stereo",
            _ => "multichannel",
        };
        write!(f, "{}-bit {} Hz {}", self.bit_depth, self.sample_rate, layout)
    }
}
