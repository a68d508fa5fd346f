//! Error taxonomy for task processing.
//!
//! Every failure a task can hit is one of these kinds; the worker boundary
//! converts any of them into a failed result record, so the poll loop never
//! sees a task error.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    /// The descriptor file could not be parsed at all.
    #[error("malformed descriptor {path}: {detail}")]
    MalformedDescriptor { path: PathBuf, detail: String },

    /// The descriptor parsed but failed a structural/semantic check.
    /// The attached reason is human-readable and ends up in the result record.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced input (image file, descriptor) is missing.
    #[error("not found: {0}")]
    NotFound(PathBuf),

    /// The external segmentation engine failed or returned garbage.
    #[error("inference failed: {0}")]
    Inference(String),

    /// A new result's grid disagrees with the persisted baseline volume.
    /// Recoverable: the merger skips that one label.
    #[error("geometry mismatch for label {label}: result {result:?} vs baseline {baseline:?}")]
    GeometryMismatch {
        label: i16,
        result: [usize; 3],
        baseline: [usize; 3],
    },

    /// Archive/write failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskError {
    pub fn is_validation(&self) -> bool {
        matches!(self, TaskError::Validation(_))
    }
}
