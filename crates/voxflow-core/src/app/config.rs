//! Service configuration.
//!
//! Loaded from a JSON file; a missing or unreadable file falls back to the
//! built-in defaults so the service can start on a fresh machine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::SegmentationKind;

/// Mask file name written into each output directory.
pub const MASK_FILE_NAME: &str = "ct_seg.nii.gz";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Watched directory descriptor files are dropped into.
    pub tasks_directory: PathBuf,
    /// Where processed descriptors and result records land.
    pub archive_directory: PathBuf,
    /// Seconds between directory scans.
    pub poll_interval_secs: u64,
    /// Fixed worker pool size.
    pub worker_count: usize,
    /// Device preference handed to the engine ("auto", "cpu", "cuda:0", ...).
    pub device_preference: String,
    /// Kind assumed when a descriptor omits `segmentation_type`.
    pub default_segmentation_type: SegmentationKind,
    /// Labels requested by full-type tasks.
    pub full_label_catalog: Vec<i16>,
    /// Engine endpoint for the HTTP adapter.
    pub engine_endpoint: String,
    /// Opaque engine configuration reference, passed through untouched.
    pub engine_config: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tasks_directory: PathBuf::from("tasks"),
            archive_directory: PathBuf::from("taskshistory"),
            poll_interval_secs: 1,
            worker_count: 5,
            device_preference: "auto".to_string(),
            default_segmentation_type: SegmentationKind::Full,
            full_label_catalog: (1..=117).collect(),
            engine_endpoint: "http://127.0.0.1:8093".to_string(),
            engine_config: None,
        }
    }
}

impl ServiceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Load from `path`, falling back to defaults when the file is missing
    /// or broken.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(config) => {
                    info!(config = %path.display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(config = %path.display(), error = %e, "unparsable configuration, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(config = %path.display(), error = %e, "configuration unreadable, using defaults");
                Self::default()
            }
        }
    }

    /// Re-root the relative directories under `base`.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        if self.tasks_directory.is_relative() {
            self.tasks_directory = base.join(&self.tasks_directory);
        }
        if self.archive_directory.is_relative() {
            self.archive_directory = base.join(&self.archive_directory);
        }
        self
    }
}
