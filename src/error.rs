//! Typed failures for the scoring pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Failure classes raised by pipeline stages.
///
/// Per-row problems are counted and skipped by the stages; only the structural
/// variants abort a batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required table or artifact is absent. Fatal at batch start.
    #[error("missing {what}: {}", path.display())]
    MissingResource { what: &'static str, path: PathBuf },

    /// A single row could not be used; `row` is the input line or review id.
    #[error("malformed row {row}: {reason}")]
    MalformedRow { row: u64, reason: String },

    /// Training cannot produce a usable artifact.
    #[error("degenerate model: {0}")]
    DegenerateModel(String),

    /// A persisted artifact exists but cannot be used for inference.
    #[error("unusable model artifact {}: {reason}", path.display())]
    UnusableModel { path: PathBuf, reason: String },
}

impl PipelineError {
    pub fn missing(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::MissingResource {
            what,
            path: path.into(),
        }
    }

    /// Check a prerequisite path, failing fast when absent.
    pub fn require(what: &'static str, path: &std::path::Path) -> Result<(), Self> {
        if path.exists() {
            Ok(())
        } else {
            Err(Self::missing(what, path))
        }
    }
}
