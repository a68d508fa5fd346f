//! Per-output-directory write serialization.
//!
//! Two tasks targeting the same output directory would race on the persisted
//! volume and registry files; each directory gets one async mutex that the
//! worker holds across reconcile, merge, and persist.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct OutputDirLocks {
    inner: Arc<StdMutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl OutputDirLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `directory`, created on first use. Callers hold the
    /// returned mutex for the whole merge-and-persist section.
    pub fn lock_for(&self, directory: &Path) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap();
        Arc::clone(
            map.entry(directory.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}
