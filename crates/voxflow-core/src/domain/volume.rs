//! Persisted multi-label annotation volume.
//!
//! One `i16` per voxel keeps labels mutually exclusive by construction: a
//! voxel holds exactly one label (0 = background). Shape and affine are
//! fixed once the volume is first allocated for an output directory.

use serde::{Deserialize, Serialize};

/// 4x4 affine mapping voxel indices to physical coordinates.
pub type Affine = [[f64; 4]; 4];

pub const IDENTITY_AFFINE: Affine = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Multi-label integer volume with its spatial transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelVolume {
    shape: [usize; 3],
    affine: Affine,
    voxels: Vec<i16>,
}

impl LabelVolume {
    /// All-background volume of the given geometry.
    pub fn zeros(shape: [usize; 3], affine: Affine) -> Self {
        Self {
            shape,
            affine,
            voxels: vec![0; shape[0] * shape[1] * shape[2]],
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    pub fn voxels(&self) -> &[i16] {
        &self.voxels
    }

    pub fn voxels_mut(&mut self) -> &mut [i16] {
        &mut self.voxels
    }

    /// Distinct non-background labels present, sorted.
    pub fn labels(&self) -> Vec<i16> {
        let mut labels: Vec<i16> = self.voxels.iter().copied().filter(|&v| v != 0).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// Number of voxels assigned to `label`.
    pub fn count(&self, label: i16) -> usize {
        self.voxels.iter().filter(|&&v| v == label).count()
    }

    /// Map a voxel-index coordinate through the affine into physical space.
    pub fn voxel_to_physical(&self, voxel: [f64; 3]) -> [f64; 3] {
        let homogeneous = [voxel[0], voxel[1], voxel[2], 1.0];
        let mut out = [0.0; 3];
        for (row, slot) in out.iter_mut().enumerate() {
            *slot = self.affine[row]
                .iter()
                .zip(homogeneous.iter())
                .map(|(a, b)| a * b)
                .sum();
        }
        out
    }

    /// Build a volume from a field that already carries label values
    /// (the full-segmentation path). Values are rounded to the nearest label.
    pub fn from_label_field(shape: [usize; 3], affine: Affine, field: &[f32]) -> Self {
        let voxels = field.iter().map(|&v| v.round() as i16).collect();
        Self {
            shape,
            affine,
            voxels,
        }
    }
}
