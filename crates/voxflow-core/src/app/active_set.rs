//! Active task set - the duplicate-claim barrier.
//!
//! Claiming is an atomic check-and-insert under one mutex; this is the only
//! mechanism preventing two workers from picking up the same descriptor.
//! Release is RAII: dropping the guard removes the entry on every exit path,
//! panics included.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct ActiveTaskSet {
    inner: Arc<Mutex<HashSet<PathBuf>>>,
}

impl ActiveTaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a descriptor. `None` means someone else holds it.
    pub fn claim(&self, path: &Path) -> Option<ClaimGuard> {
        let mut set = self.inner.lock().unwrap();
        if set.insert(path.to_path_buf()) {
            Some(ClaimGuard {
                set: Arc::clone(&self.inner),
                path: path.to_path_buf(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.lock().unwrap().contains(path)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

pub struct ClaimGuard {
    set: Arc<Mutex<HashSet<PathBuf>>>,
    path: PathBuf,
}

impl ClaimGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.set.lock().unwrap().remove(&self.path);
    }
}
