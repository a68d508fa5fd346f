//! ROI registry file - one JSON metadata file per output directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{RoiRegistry, TaskError};

/// Registry file name inside an output directory.
pub const REGISTRY_FILE_NAME: &str = "ct_seg.json";

pub struct RegistryStore;

impl RegistryStore {
    pub fn path_for(output_directory: &Path) -> PathBuf {
        output_directory.join(REGISTRY_FILE_NAME)
    }

    /// Load the registry for an output directory; absent file means an empty
    /// registry, not an error.
    pub fn load(&self, output_directory: &Path) -> Result<RoiRegistry, TaskError> {
        let path = Self::path_for(output_directory);
        if !path.exists() {
            return Ok(RoiRegistry::default());
        }
        let bytes = fs::read(&path)?;
        serde_json::from_slice(&bytes).map_err(|e| TaskError::MalformedDescriptor {
            path,
            detail: e.to_string(),
        })
    }

    pub fn save(&self, output_directory: &Path, registry: &RoiRegistry) -> Result<(), TaskError> {
        fs::create_dir_all(output_directory)?;
        let path = Self::path_for(output_directory);
        let body = serde_json::to_vec_pretty(registry).map_err(std::io::Error::other)?;
        fs::write(&path, body)?;
        Ok(())
    }
}
