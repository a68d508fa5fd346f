//! Volume store port.
//!
//! Image codecs for the persisted volume are external collaborators; the
//! core only needs load/save of a labeled grid with its transform.

use std::path::Path;

use crate::domain::{LabelVolume, TaskError};

pub trait VolumeStore: Send + Sync {
    /// Load the persisted volume, or `None` when no volume exists yet for
    /// this path.
    fn load(&self, path: &Path) -> Result<Option<LabelVolume>, TaskError>;

    fn save(&self, path: &Path, volume: &LabelVolume) -> Result<(), TaskError>;
}
