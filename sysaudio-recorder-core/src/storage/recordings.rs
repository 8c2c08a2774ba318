use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::error::CaptureError;

/// A completed recording found in the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingEntry {
    pub name: String,
    pub size: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_modified: DateTime<Utc>,
    pub path: PathBuf,
}

/// List files in `directory` with the given extension, newest first.
///
/// A directory that does not exist yet simply has no recordings.
pub fn list_recordings(directory: &Path, extension: &str) -> Result<Vec<RecordingEntry>, CaptureError> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(CaptureError::StorageError(format!(
                "failed to read {}: {}",
                directory.display(),
                e
            )))
        }
    };

    let mut recordings = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }

        let meta = match entry.metadata() {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let last_modified = meta.modified().map(DateTime::<Utc>::from).unwrap_or_default();

        recordings.push(RecordingEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            size: meta.len(),
            last_modified,
            path,
        });
    }

    recordings.sort_by(|a, b| b.last_modified.cmp(&a.last_modified).then_with(|| b.name.cmp(&a.name)));
    log::debug!("Found {} recordings in {}", recordings.len(), directory.display());
    Ok(recordings)
}
