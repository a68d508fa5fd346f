//! Scripted in-process engine for development and tests.
//!
//! Responses are scripted per label; call counters make "zero engine calls
//! on resubmission" assertions possible, and an optional gate lets a test
//! hold a worker mid-inference to exercise claim semantics.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::domain::{Affine, IDENTITY_AFFINE, TaskError};
use crate::ports::{Polarity, SegmentationResult, Segmenter};

pub struct StubSegmenter {
    shape: [usize; 3],
    affine: Affine,
    point_fields: Mutex<HashMap<i16, Vec<f32>>>,
    full_field: Mutex<Option<Vec<f32>>>,
    fail_message: Mutex<Option<String>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    point_calls: AtomicUsize,
    full_calls: AtomicUsize,
    invalidations: AtomicUsize,
}

impl StubSegmenter {
    pub fn new(shape: [usize; 3]) -> Self {
        Self {
            shape,
            affine: IDENTITY_AFFINE,
            point_fields: Mutex::new(HashMap::new()),
            full_field: Mutex::new(None),
            fail_message: Mutex::new(None),
            gate: Mutex::new(None),
            point_calls: AtomicUsize::new(0),
            full_calls: AtomicUsize::new(0),
            invalidations: AtomicUsize::new(0),
        }
    }

    pub fn with_affine(mut self, affine: Affine) -> Self {
        self.affine = affine;
        self
    }

    /// Script the probability field returned for `label`.
    pub fn with_point_field(self, label: i16, field: Vec<f32>) -> Self {
        self.point_fields.lock().unwrap().insert(label, field);
        self
    }

    /// Script the label field returned by full inference.
    pub fn with_full_field(self, field: Vec<f32>) -> Self {
        *self.full_field.lock().unwrap() = Some(field);
        self
    }

    /// Make every subsequent call fail with an inference error.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_message.lock().unwrap() = Some(message.into());
    }

    /// Install a gate the engine must pass on every call. With zero permits
    /// available the worker blocks until the test releases it.
    pub fn set_gate(&self, gate: Arc<Semaphore>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    pub fn point_calls(&self) -> usize {
        self.point_calls.load(Ordering::SeqCst)
    }

    pub fn full_calls(&self) -> usize {
        self.full_calls.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    fn voxel_count(&self) -> usize {
        self.shape[0] * self.shape[1] * self.shape[2]
    }

    async fn pass_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }
    }

    fn scripted_failure(&self) -> Option<TaskError> {
        self.fail_message
            .lock()
            .unwrap()
            .clone()
            .map(TaskError::Inference)
    }
}

#[async_trait]
impl Segmenter for StubSegmenter {
    async fn infer_point(
        &self,
        _image: &Path,
        _points: &[[f64; 3]],
        _polarities: &[Polarity],
        target_label: i16,
        _device: &str,
    ) -> Result<SegmentationResult, TaskError> {
        self.pass_gate().await;
        self.point_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.scripted_failure() {
            return Err(err);
        }
        let field = self
            .point_fields
            .lock()
            .unwrap()
            .get(&target_label)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.voxel_count()]);
        Ok(SegmentationResult {
            target_label,
            shape: self.shape,
            affine: self.affine,
            field,
        })
    }

    async fn infer_full(
        &self,
        _image: &Path,
        label_catalog: &[i16],
        _device: &str,
    ) -> Result<SegmentationResult, TaskError> {
        self.pass_gate().await;
        self.full_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.scripted_failure() {
            return Err(err);
        }
        let field = self.full_field.lock().unwrap().clone().unwrap_or_else(|| {
            // Unscripted default: the first catalog label everywhere.
            let value = label_catalog.first().copied().unwrap_or(0) as f32;
            vec![value; self.voxel_count()]
        });
        Ok(SegmentationResult {
            target_label: 0,
            shape: self.shape,
            affine: self.affine,
            field,
        })
    }

    async fn invalidate_cache(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}
