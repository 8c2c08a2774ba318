use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::models::error::CaptureError;

/// Upper bound on timestamp bumps when a file name is already taken.
const MAX_NAME_ATTEMPTS: i64 = 1000;

/// Write-only byte sink bound to one output file for one session.
///
/// ## File Format
///
/// ```text
/// [raw interleaved little-endian PCM bytes...]
/// ```
/// There is no header; the consumer learns the format out-of-band.
pub struct CaptureSink {
    file_path: PathBuf,
    writer: Option<BufWriter<File>>,
    total_bytes_written: u64,
}

impl CaptureSink {
    /// Create a new file at `file_path`. Fails if the file already exists.
    pub fn create(file_path: PathBuf) -> Result<Self, CaptureError> {
        if let Some(parent) = file_path.parent() {
            ensure_directory(parent)?;
        }
        let file = open_new(&file_path).map_err(|e| create_error(&file_path, e))?;
        Ok(Self::from_file(file_path, file))
    }

    /// Create `{prefix}{millis}.{extension}` in `directory`, named after `captured_at`.
    ///
    /// If that name is taken the timestamp is bumped one millisecond at a
    /// time, so back-to-back sessions never share a file.
    pub fn create_timestamped(
        directory: &Path,
        prefix: &str,
        extension: &str,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, CaptureError> {
        ensure_directory(directory)?;

        let base = captured_at.timestamp_millis();
        for offset in 0..MAX_NAME_ATTEMPTS {
            let path = directory.join(file_name_for(prefix, base + offset, extension));
            match open_new(&path) {
                Ok(file) => return Ok(Self::from_file(path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(create_error(&path, e)),
            }
        }
        Err(CaptureError::StorageError(format!(
            "no free file name for {}{}.{}",
            prefix, base, extension
        )))
    }

    fn from_file(file_path: PathBuf, file: File) -> Self {
        Self {
            file_path,
            writer: Some(BufWriter::new(file)),
            total_bytes_written: 0,
        }
    }

    /// Append `data` to the file.
    pub fn write(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("sink is closed".into()))?;
        writer
            .write_all(data)
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }

    /// Flush buffered bytes to disk and close the file.
    ///
    /// Returns the total number of bytes written. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<u64, CaptureError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(self.total_bytes_written);
        };
        writer
            .flush()
            .map_err(|e| CaptureError::StorageError(format!("flush failed: {}", e)))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| CaptureError::StorageError(format!("sync failed: {}", e)))?;
        Ok(self.total_bytes_written)
    }

    /// Close and delete the file. Used when a session fails to start.
    pub fn discard(mut self) {
        self.writer = None;
        if let Err(e) = fs::remove_file(&self.file_path) {
            log::warn!("Failed to remove {}: {}", self.file_path.display(), e);
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

fn ensure_directory(directory: &Path) -> Result<(), CaptureError> {
    fs::create_dir_all(directory)
        .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))
}

fn open_new(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn create_error(path: &Path, e: std::io::Error) -> CaptureError {
    CaptureError::StorageError(format!("failed to create {}: {}", path.display(), e))
}

/// File name for a capture started at `millis` since the Unix epoch.
pub fn file_name_for(prefix: &str, millis: i64, extension: &str) -> String {
    format!("{}{}.{}", prefix, millis, extension)
}
