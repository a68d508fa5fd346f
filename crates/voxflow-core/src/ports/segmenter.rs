//! Segmenter port - the contract with the external inference engine.
//!
//! The engine itself is an external collaborator; this crate only depends on
//! its call shape. Expected guarantees: deterministic for identical inputs
//! and device, and a grid shape that is consistent across calls for the same
//! image.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::{Affine, TaskError};

/// Whether a prompt point marks the target region or its surroundings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

/// Engine output for one prompt (or one full-catalog call): a scalar field
/// over a 3-D grid plus its spatial transform and originating label.
///
/// For point inference the field is a probability map to be binarized by the
/// merger; for full inference it already carries label values.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationResult {
    pub target_label: i16,
    pub shape: [usize; 3],
    pub affine: Affine,
    pub field: Vec<f32>,
}

impl SegmentationResult {
    pub fn voxel_count(&self) -> usize {
        self.shape[0] * self.shape[1] * self.shape[2]
    }
}

#[async_trait]
pub trait Segmenter: Send + Sync {
    /// Segment one labeled region from point prompts. `points` and
    /// `polarities` are parallel slices; each call is independent of the
    /// previous one.
    async fn infer_point(
        &self,
        image: &Path,
        points: &[[f64; 3]],
        polarities: &[Polarity],
        target_label: i16,
        device: &str,
    ) -> Result<SegmentationResult, TaskError>;

    /// Segment the entire label catalog in one call. The result replaces any
    /// prior volume wholesale; no merge applies.
    async fn infer_full(
        &self,
        image: &Path,
        label_catalog: &[i16],
        device: &str,
    ) -> Result<SegmentationResult, TaskError>;

    /// Drop any engine-internal prompt cache. Called between target labels
    /// that use different point sets; engines without a cache ignore it.
    async fn invalidate_cache(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IDENTITY_AFFINE;

    #[test]
    fn voxel_count_matches_shape() {
        let r = SegmentationResult {
            target_label: 1,
            shape: [2, 3, 4],
            affine: IDENTITY_AFFINE,
            field: vec![0.0; 24],
        };
        assert_eq!(r.voxel_count(), 24);
        assert_eq!(r.voxel_count(), r.field.len());
    }
}
