//! Mask merger - upserts per-label results into the persisted volume.
//!
//! The baseline geometry comes from the persisted volume when one exists,
//! otherwise from the first new result. Per result, the probability field is
//! binarized at [`BINARIZE_THRESHOLD`], every voxel currently holding that
//! label is cleared (a label can shrink or move between runs), then the
//! binarized voxels are set. Results apply in descriptor-prompt order, so a
//! later prompt wins wherever binarized regions overlap.

use tracing::warn;

use crate::domain::{LabelVolume, TaskError};
use crate::ports::SegmentationResult;

/// Probability cutoff separating "inside the region" from background.
pub const BINARIZE_THRESHOLD: f32 = 0.5;

/// Merge new results into the existing volume.
///
/// Returns `None` when there is nothing to persist (no prior volume and no
/// results). A result whose grid disagrees with the baseline is skipped and
/// logged; the rest of the merge proceeds.
pub fn merge(
    existing: Option<LabelVolume>,
    results: &[SegmentationResult],
) -> Option<LabelVolume> {
    let mut volume = match existing {
        Some(v) => v,
        None => {
            let first = results.first()?;
            LabelVolume::zeros(first.shape, first.affine)
        }
    };

    for result in results {
        if let Err(e) = apply(&mut volume, result) {
            warn!(label = result.target_label, error = %e, "skipping label with mismatched geometry");
        }
    }

    Some(volume)
}

/// Apply one result to the baseline: clear stale assignments of the label,
/// then set the binarized region.
fn apply(volume: &mut LabelVolume, result: &SegmentationResult) -> Result<(), TaskError> {
    if result.shape != volume.shape() || result.field.len() != volume.len() {
        return Err(TaskError::GeometryMismatch {
            label: result.target_label,
            result: result.shape,
            baseline: volume.shape(),
        });
    }

    let label = result.target_label;
    for (voxel, &p) in volume.voxels_mut().iter_mut().zip(result.field.iter()) {
        if *voxel == label {
            *voxel = 0;
        }
        if p > BINARIZE_THRESHOLD {
            *voxel = label;
        }
    }
    Ok(())
}
