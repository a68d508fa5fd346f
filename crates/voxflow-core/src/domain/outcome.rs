//! Per-descriptor outcome record.
//!
//! Exactly one of these is written for every processed descriptor, whatever
//! happened, so no descriptor is ever silently dropped.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The result file written next to the archived descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub task_id: String,
    /// RFC 3339 completion timestamp.
    pub processed_time: String,
    pub success: bool,
    pub message: String,
    /// Path of the persisted volume, when it exists on disk.
    pub output_mask: Option<PathBuf>,
    /// Path of the ROI registry file, when it exists on disk.
    pub output_labels: Option<PathBuf>,
}

impl ResultRecord {
    pub fn success(task_id: impl Into<String>, processed_time: String, message: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            processed_time,
            success: true,
            message: message.into(),
            output_mask: None,
            output_labels: None,
        }
    }

    pub fn failure(task_id: impl Into<String>, processed_time: String, message: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            processed_time,
            success: false,
            message: message.into(),
            output_mask: None,
            output_labels: None,
        }
    }

    pub fn with_output_mask(mut self, path: PathBuf) -> Self {
        self.output_mask = Some(path);
        self
    }

    pub fn with_output_labels(mut self, path: PathBuf) -> Self {
        self.output_labels = Some(path);
        self
    }
}
