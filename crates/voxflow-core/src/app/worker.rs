//! Task execution - one descriptor, start to finish.
//!
//! [`TaskRunner::run`] is the per-task error boundary: whatever happens
//! inside, the descriptor ends up archived exactly once with exactly one
//! result record, and the poll loop never sees the failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::app::config::{MASK_FILE_NAME, ServiceConfig};
use crate::app::dir_locks::OutputDirLocks;
use crate::domain::{
    LabelVolume, PromptSpec, ResultRecord, SegmentationRequest, TaskDescriptor, TaskError,
};
use crate::merge;
use crate::ports::{Clock, Polarity, SegmentationResult, Segmenter, VolumeStore};
use crate::reconcile;
use crate::store::{ArchiveStatus, DescriptorStore, RegistryStore, ResultRecorder};
use crate::validate;

pub struct TaskRunner {
    store: Arc<DescriptorStore>,
    recorder: ResultRecorder,
    segmenter: Arc<dyn Segmenter>,
    volumes: Arc<dyn VolumeStore>,
    clock: Arc<dyn Clock>,
    dir_locks: OutputDirLocks,
    config: Arc<ServiceConfig>,
}

impl TaskRunner {
    pub fn new(
        store: Arc<DescriptorStore>,
        segmenter: Arc<dyn Segmenter>,
        volumes: Arc<dyn VolumeStore>,
        clock: Arc<dyn Clock>,
        config: Arc<ServiceConfig>,
    ) -> Self {
        Self {
            recorder: ResultRecorder::new(Arc::clone(&store)),
            store,
            segmenter,
            volumes,
            clock,
            dir_locks: OutputDirLocks::new(),
            config,
        }
    }

    /// Process one claimed descriptor file.
    pub async fn run(&self, descriptor_path: &Path) {
        let raw = match self.store.load(descriptor_path) {
            Ok(raw) => raw,
            Err(e) => {
                error!(descriptor = %descriptor_path.display(), error = %e, "descriptor unreadable");
                let record = ResultRecord::failure(
                    fallback_task_id(descriptor_path),
                    self.timestamp(),
                    format!("Error: {e}"),
                );
                self.finish(descriptor_path, record, ArchiveStatus::ErrorProcessing);
                return;
            }
        };
        let task_id = raw
            .task_id
            .clone()
            .unwrap_or_else(|| fallback_task_id(descriptor_path));

        let descriptor = match validate::validate(raw, self.config.default_segmentation_type) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                error!(%task_id, reason = %e, "task validation failed");
                let record = ResultRecord::failure(
                    &task_id,
                    self.timestamp(),
                    format!("Validation Failed: {e}"),
                );
                self.finish(descriptor_path, record, ArchiveStatus::FailedValidation);
                return;
            }
        };

        info!(%task_id, kind = %descriptor.kind(), "task validated, executing");
        match self.execute(&descriptor).await {
            Ok(message) => {
                let record = self.attach_outputs(
                    ResultRecord::success(&task_id, self.timestamp(), message),
                    &descriptor,
                );
                info!(%task_id, "task completed");
                self.finish(descriptor_path, record, ArchiveStatus::Completed);
            }
            Err(e) => {
                error!(%task_id, error = %e, "task execution failed");
                let record = ResultRecord::failure(&task_id, self.timestamp(), format!("Error: {e}"));
                self.finish(descriptor_path, record, ArchiveStatus::ErrorProcessing);
            }
        }
    }

    async fn execute(&self, descriptor: &TaskDescriptor) -> Result<String, TaskError> {
        std::fs::create_dir_all(&descriptor.output_directory)?;

        // Serialize volume/registry writes per output directory.
        let lock = self.dir_locks.lock_for(&descriptor.output_directory);
        let _guard = lock.lock().await;

        let mask_path = self.mask_path(descriptor);
        match &descriptor.request {
            SegmentationRequest::Full => {
                let result = self
                    .segmenter
                    .infer_full(
                        &descriptor.input_file,
                        &self.config.full_label_catalog,
                        &self.config.device_preference,
                    )
                    .await?;
                let volume =
                    LabelVolume::from_label_field(result.shape, result.affine, &result.field);
                self.volumes.save(&mask_path, &volume)?;
                Ok("Full segmentation completed successfully.".to_string())
            }
            SegmentationRequest::Point(prompts) => {
                self.execute_point(descriptor, prompts, &mask_path).await
            }
        }
    }

    async fn execute_point(
        &self,
        descriptor: &TaskDescriptor,
        prompts: &[PromptSpec],
        mask_path: &Path,
    ) -> Result<String, TaskError> {
        let registry = RegistryStore.load(&descriptor.output_directory)?;
        let plan = reconcile::plan(prompts, &registry);
        if plan.nothing_to_run() {
            info!(
                task_id = %descriptor.task_id,
                skipped = plan.skipped.len(),
                "all prompts unchanged, nothing to recompute"
            );
            return Ok("All prompts unchanged; nothing to recompute.".to_string());
        }

        let mut results: Vec<SegmentationResult> = Vec::with_capacity(plan.to_run.len());
        for prompt in &plan.to_run {
            // Engines may cache per-prompt state; drop it between labels.
            self.segmenter.invalidate_cache().await;
            let (points, polarities) = flatten_points(prompt);
            let result = self
                .segmenter
                .infer_point(
                    &descriptor.input_file,
                    &points,
                    &polarities,
                    prompt.target_output_label,
                    &self.config.device_preference,
                )
                .await?;
            results.push(result);
        }

        let existing = self.volumes.load(mask_path)?;
        let merged = merge::merge(existing, &results);
        if let Some(volume) = &merged {
            self.volumes.save(mask_path, volume)?;
        }

        let rebuilt = reconcile::rebuild(&registry, prompts, merged.as_ref());
        RegistryStore.save(&descriptor.output_directory, &rebuilt)?;

        Ok(format!(
            "Point segmentation completed successfully ({} recomputed, {} unchanged).",
            plan.to_run.len(),
            plan.skipped.len()
        ))
    }

    fn attach_outputs(&self, mut record: ResultRecord, descriptor: &TaskDescriptor) -> ResultRecord {
        let mask_path = self.mask_path(descriptor);
        if mask_path.exists() {
            record = record.with_output_mask(mask_path);
        }
        if matches!(descriptor.request, SegmentationRequest::Point(_)) {
            let registry_path = RegistryStore::path_for(&descriptor.output_directory);
            if registry_path.exists() {
                record = record.with_output_labels(registry_path);
            }
        }
        record
    }

    fn mask_path(&self, descriptor: &TaskDescriptor) -> PathBuf {
        descriptor.output_directory.join(MASK_FILE_NAME)
    }

    fn timestamp(&self) -> String {
        self.clock.now().to_rfc3339()
    }

    fn finish(&self, descriptor_path: &Path, record: ResultRecord, status: ArchiveStatus) {
        if let Err(e) = self.recorder.finish(descriptor_path, &record, status) {
            error!(descriptor = %descriptor_path.display(), error = %e, "result recording failed");
        }
    }
}

fn fallback_task_id(descriptor_path: &Path) -> String {
    descriptor_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| descriptor_path.display().to_string())
}

/// Positives first, then negatives, with parallel polarities - the order the
/// engine contract expects.
fn flatten_points(prompt: &PromptSpec) -> (Vec<[f64; 3]>, Vec<Polarity>) {
    let mut points = Vec::with_capacity(prompt.point_count());
    let mut polarities = Vec::with_capacity(prompt.point_count());
    for p in &prompt.positive_points {
        points.push(*p);
        polarities.push(Polarity::Positive);
    }
    for p in &prompt.negative_points {
        points.push(*p);
        polarities.push(Polarity::Negative);
    }
    (points, polarities)
}
