use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sysaudio_recorder_core::{CaptureConfiguration, OverlayTiming};

/// Sub-directory of the platform cache directory that holds recordings.
pub const RECORDINGS_DIR_NAME: &str = "system_audio_recorder";

/// Host-side configuration, loadable from JSON. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub capture: CaptureConfiguration,
    pub overlay: OverlayTiming,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfiguration::with_output_directory(default_recordings_dir()),
            overlay: OverlayTiming::default(),
        }
    }
}

impl RecorderConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// Failure to load a [`RecorderConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid recorder config: {0}")]
    Parse(#[from] serde_json::Error),
}

fn default_recordings_dir() -> PathBuf {
    dirs_next::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(RECORDINGS_DIR_NAME)
}
