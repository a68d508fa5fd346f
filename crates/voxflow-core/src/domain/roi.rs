//! ROI registry records.
//!
//! Field names follow the external registry file format exactly
//! (`{"rois": [{ROIIndex, ROIName, ROIColor, ROICenter, visible}, ...]}`),
//! which downstream viewers consume as-is.

use serde::{Deserialize, Serialize};

/// Cyclic color palette for ROI display. Assignment is deterministic:
/// an entry's color is the palette slot at its position in the sorted
/// unique-label list, modulo the palette length.
pub const ROI_PALETTE: [[f32; 3]; 31] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.5, 0.5, 1.0],
    [0.0, 0.5, 1.0],
    [1.0, 0.5, 1.0],
    [1.0, 0.5, 0.0],
    [0.2, 0.5, 0.2],
    [0.2, 0.8, 0.4],
    [1.0, 0.0, 0.5],
    [0.5, 0.0, 0.0],
    [0.0, 0.5, 0.0],
    [1.0, 0.0, 0.5],
    [0.0, 0.5, 0.5],
    [0.5, 0.0, 1.0],
    [1.0, 0.2, 0.2],
    [0.7, 0.7, 0.0],
    [0.2, 0.2, 0.7],
    [0.0, 0.7, 0.7],
    [0.7, 0.0, 0.7],
    [0.7, 0.5, 0.2],
    [0.4, 0.7, 0.2],
    [0.8, 0.2, 0.8],
    [0.8, 0.8, 0.2],
    [0.2, 0.8, 0.8],
    [0.8, 0.2, 0.2],
    [0.5, 0.2, 0.7],
    [0.7, 0.5, 0.7],
    [0.5, 0.7, 0.2],
    [0.2, 0.7, 0.5],
    [0.7, 0.2, 0.5],
];

/// One named, colored, located region for a given label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiEntry {
    /// Unique key within one registry; equals the target output label.
    #[serde(rename = "ROIIndex")]
    pub index: i16,

    #[serde(rename = "ROIName")]
    pub name: String,

    #[serde(rename = "ROIColor")]
    pub color: [f32; 3],

    /// Physical-space center used as a change-detection fingerprint.
    #[serde(rename = "ROICenter")]
    pub center: Option<[f64; 3]>,

    pub visible: bool,
}

impl RoiEntry {
    pub fn new(index: i16, name: impl Into<String>, center: Option<[f64; 3]>) -> Self {
        Self {
            index,
            name: name.into(),
            color: ROI_PALETTE[0],
            center,
            visible: true,
        }
    }
}

/// The set of ROI entries for one output directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoiRegistry {
    pub rois: Vec<RoiEntry>,
}

impl RoiRegistry {
    pub fn entry(&self, index: i16) -> Option<&RoiEntry> {
        self.rois.iter().find(|r| r.index == index)
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }
}
