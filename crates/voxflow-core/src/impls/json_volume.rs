//! JSON-file volume store.
//!
//! A stand-in codec behind the [`VolumeStore`] port: real deployments plug a
//! medical-image-format store here, which is an external collaborator. The
//! JSON form keeps the geometry and voxel data intact, which is all the
//! merge protocol needs.

use std::fs;
use std::path::Path;

use crate::domain::{LabelVolume, TaskError};
use crate::ports::VolumeStore;

pub struct JsonVolumeStore;

impl VolumeStore for JsonVolumeStore {
    fn load(&self, path: &Path) -> Result<Option<LabelVolume>, TaskError> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        let volume = serde_json::from_slice(&bytes).map_err(std::io::Error::other)?;
        Ok(Some(volume))
    }

    fn save(&self, path: &Path, volume: &LabelVolume) -> Result<(), TaskError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec(volume).map_err(std::io::Error::other)?;
        fs::write(path, body)?;
        Ok(())
    }
}
