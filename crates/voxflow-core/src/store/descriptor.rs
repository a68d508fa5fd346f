//! Descriptor store - lists, loads, and archives task descriptor files.
//!
//! The filesystem move into the archive directory is the sole signal that a
//! descriptor has been handled; a descriptor still sitting in the watched
//! directory after a crash is simply reclaimed on the next scan.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{DESCRIPTOR_EXTENSION, RawDescriptor, TaskError};

/// How a descriptor left the pipeline; drives the archive name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStatus {
    Completed,
    FailedValidation,
    ErrorProcessing,
}

impl ArchiveStatus {
    pub fn prefix(&self) -> &'static str {
        match self {
            ArchiveStatus::Completed => "",
            ArchiveStatus::FailedValidation => "failed_validation_",
            ArchiveStatus::ErrorProcessing => "error_processing_",
        }
    }
}

pub struct DescriptorStore {
    tasks_dir: PathBuf,
    archive_dir: PathBuf,
}

impl DescriptorStore {
    /// Open the store, creating both directories if absent.
    pub fn open(tasks_dir: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>) -> Result<Self, TaskError> {
        let tasks_dir = tasks_dir.into();
        let archive_dir = archive_dir.into();
        fs::create_dir_all(&tasks_dir)?;
        fs::create_dir_all(&archive_dir)?;
        Ok(Self {
            tasks_dir,
            archive_dir,
        })
    }

    pub fn tasks_dir(&self) -> &Path {
        &self.tasks_dir
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Descriptor files currently in the watched directory, sorted by name
    /// so processing order is deterministic across scans.
    pub fn list(&self) -> Result<Vec<PathBuf>, TaskError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.tasks_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(DESCRIPTOR_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Parse one descriptor file. Any JSON error maps to
    /// `MalformedDescriptor`.
    pub fn load(&self, path: &Path) -> Result<RawDescriptor, TaskError> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| TaskError::MalformedDescriptor {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Move a descriptor into the archive directory under a status-derived
    /// name. Returns the destination path.
    pub fn archive(&self, path: &Path, status: ArchiveStatus) -> Result<PathBuf, TaskError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| TaskError::NotFound(path.to_path_buf()))?;
        let destination = self
            .archive_dir
            .join(format!("{}{}", status.prefix(), file_name.to_string_lossy()));
        fs::rename(path, &destination)?;
        Ok(destination)
    }
}
