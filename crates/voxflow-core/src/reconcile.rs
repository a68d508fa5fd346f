//! ROI reconciler - decides which prompts need recomputation and rebuilds
//! the registry for an output directory.
//!
//! Change detection keys off the prompt's physical center: a prompt is
//! recomputed when it has no center, no registry entry exists for its label,
//! or the centers drifted beyond [`CENTER_TOLERANCE`]. Everything else is
//! skipped entirely - no engine call, no merge contribution - which is what
//! makes resubmitting an unchanged descriptor a no-op.

use std::collections::BTreeMap;

use crate::domain::{LabelVolume, PromptSpec, ROI_PALETTE, RoiEntry, RoiRegistry};

/// Euclidean tolerance (physical units) under which two centers are "the
/// same region".
pub const CENTER_TOLERANCE: f64 = 1e-3;

/// Prompts split into the ones to send to the engine and the ones whose
/// registry entry already matches. Order within `to_run` is descriptor order,
/// which the merger relies on.
#[derive(Debug)]
pub struct ReconcilePlan<'a> {
    pub to_run: Vec<&'a PromptSpec>,
    pub skipped: Vec<&'a PromptSpec>,
}

impl ReconcilePlan<'_> {
    pub fn nothing_to_run(&self) -> bool {
        self.to_run.is_empty()
    }
}

pub fn plan<'a>(prompts: &'a [PromptSpec], registry: &RoiRegistry) -> ReconcilePlan<'a> {
    let (to_run, skipped) = prompts
        .iter()
        .partition(|p| needs_recompute(p, registry));
    ReconcilePlan { to_run, skipped }
}

pub fn needs_recompute(prompt: &PromptSpec, registry: &RoiRegistry) -> bool {
    let Some(center) = prompt.physical_center_of_box else {
        return true;
    };
    let Some(entry) = registry.entry(prompt.target_output_label) else {
        return true;
    };
    let Some(prior) = entry.center else {
        return true;
    };
    !centers_close(center, prior)
}

fn centers_close(a: [f64; 3], b: [f64; 3]) -> bool {
    let dist_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
    dist_sq.sqrt() <= CENTER_TOLERANCE
}

/// Rebuild the registry after a merge.
///
/// A single-prompt descriptor replaces the registry wholesale; otherwise
/// entries for the descriptor's labels are upserted and unrelated entries
/// survive unchanged. Final entries are sorted by index and recolored by
/// their position in that order, modulo the palette length.
///
/// `volume` supplies the affine for the center fallback: a prompt without a
/// physical center gets its first positive (else negative) point mapped into
/// physical space.
pub fn rebuild(
    existing: &RoiRegistry,
    prompts: &[PromptSpec],
    volume: Option<&LabelVolume>,
) -> RoiRegistry {
    let mut entries: BTreeMap<i16, RoiEntry> = if prompts.len() == 1 {
        BTreeMap::new()
    } else {
        existing
            .rois
            .iter()
            .map(|e| (e.index, e.clone()))
            .collect()
    };

    // Later prompts overwrite earlier ones for a duplicated label.
    for prompt in prompts {
        let center = prompt
            .physical_center_of_box
            .or_else(|| fallback_center(prompt, volume));
        entries.insert(
            prompt.target_output_label,
            RoiEntry::new(prompt.target_output_label, prompt.name(), center),
        );
    }

    let mut rois: Vec<RoiEntry> = entries.into_values().collect();
    for (position, entry) in rois.iter_mut().enumerate() {
        entry.color = ROI_PALETTE[position % ROI_PALETTE.len()];
    }
    RoiRegistry { rois }
}

fn fallback_center(prompt: &PromptSpec, volume: Option<&LabelVolume>) -> Option<[f64; 3]> {
    let point = prompt
        .positive_points
        .first()
        .or_else(|| prompt.negative_points.first())?;
    Some(volume?.voxel_to_physical(*point))
}
