use std::fmt;
use std::path::PathBuf;

/// Teardown step that failed during a best-effort release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStage {
    /// The worker did not exit within the bounded wait.
    WorkerJoin,
    /// The worker thread panicked.
    WorkerPanicked,
    /// Releasing the device underneath a blocked read failed.
    SourceInterrupt,
    SourceStop,
    SourceRelease,
    SinkClose,
}

impl ReleaseStage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WorkerJoin => "worker join",
            Self::WorkerPanicked => "worker panicked",
            Self::SourceInterrupt => "source interrupt",
            Self::SourceStop => "source stop",
            Self::SourceRelease => "source release",
            Self::SinkClose => "sink close",
        }
    }
}

impl fmt::Display for ReleaseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFailure {
    pub stage: ReleaseStage,
    pub message: String,
}

impl ReleaseFailure {
    pub fn new(stage: ReleaseStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Outcome of a best-effort teardown.
///
/// Each step runs regardless of earlier failures; failures are collected
/// here so callers can log them (forced reset) or surface them (stop).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    /// Output path of the session that was torn down, if there was one.
    pub output_path: Option<PathBuf>,
    failures: Vec<ReleaseFailure>,
}

impl ReleaseReport {
    pub fn for_session(output_path: PathBuf) -> Self {
        Self {
            output_path: Some(output_path),
            failures: Vec::new(),
        }
    }

    pub fn push(&mut self, failure: ReleaseFailure) {
        self.failures.push(failure);
    }

    /// Record the error of `result` under `stage`, passing the value through.
    pub fn record<T, E: fmt::Display>(&mut self, stage: ReleaseStage, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.push(ReleaseFailure::new(stage, e.to_string()));
                None
            }
        }
    }

    pub fn failures(&self) -> &[ReleaseFailure] {
        &self.failures
    }

    pub fn has_failure(&self, stage: ReleaseStage) -> bool {
        self.failures.iter().any(|f| f.stage == stage)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether a session was actually torn down.
    pub fn released_session(&self) -> bool {
        self.output_path.is_some()
    }
}

impl fmt::Display for ReleaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return f.write_str("clean");
        }
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", failure.stage, failure.message)?;
        }
        Ok(())
    }
}
