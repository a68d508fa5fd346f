//! Result recorder - persists the outcome record and archives the
//! descriptor, exactly once each, best-effort.
//!
//! Neither half may block the other: an archive failure is logged and the
//! record still gets written, and vice versa. Every processed descriptor
//! therefore leaves a trace even on the worst path.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::error;

use crate::domain::{ResultRecord, TaskError};
use crate::store::descriptor::{ArchiveStatus, DescriptorStore};

pub struct ResultRecorder {
    store: Arc<DescriptorStore>,
}

impl ResultRecorder {
    pub fn new(store: Arc<DescriptorStore>) -> Self {
        Self { store }
    }

    /// Write the record and archive the descriptor. Returns an error only
    /// when both halves failed to leave any trace.
    pub fn finish(
        &self,
        descriptor_path: &Path,
        record: &ResultRecord,
        status: ArchiveStatus,
    ) -> Result<(), TaskError> {
        let record_result = self.write_record(descriptor_path, record);
        if let Err(e) = &record_result {
            error!(task_id = %record.task_id, error = %e, "could not write result record");
        }

        let archive_result = self.store.archive(descriptor_path, status);
        if let Err(e) = &archive_result {
            error!(
                descriptor = %descriptor_path.display(),
                error = %e,
                "could not archive descriptor"
            );
        }

        match (record_result, archive_result) {
            (Err(e), Err(_)) => Err(e),
            _ => Ok(()),
        }
    }

    fn write_record(&self, descriptor_path: &Path, record: &ResultRecord) -> Result<(), TaskError> {
        let stem = descriptor_path
            .file_stem()
            .ok_or_else(|| TaskError::NotFound(descriptor_path.to_path_buf()))?
            .to_string_lossy();
        let path = self
            .store
            .archive_dir()
            .join(format!("{stem}_result.json"));
        let body = serde_json::to_vec_pretty(record).map_err(std::io::Error::other)?;
        fs::write(&path, body)?;
        Ok(())
    }
}
