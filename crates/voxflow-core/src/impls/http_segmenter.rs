//! HTTP engine adapter.
//!
//! Talks to an out-of-process inference engine over a small JSON API:
//! `POST {endpoint}/infer` for point prompts, `POST {endpoint}/infer_full`
//! for the catalog path, `POST {endpoint}/cache/invalidate` between labels.
//! The engine's own model and image decoding stay on its side of the wire.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Affine, TaskError};
use crate::ports::{Polarity, SegmentationResult, Segmenter};

#[derive(Debug, Serialize)]
struct PointRequest<'a> {
    image: &'a Path,
    points: &'a [[f64; 3]],
    /// 1 for positive, 0 for negative, parallel to `points`.
    point_labels: Vec<u8>,
    prompt_class: [i16; 1],
    device: &'a str,
}

#[derive(Debug, Serialize)]
struct FullRequest<'a> {
    image: &'a Path,
    label_prompt: &'a [i16],
    device: &'a str,
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    shape: [usize; 3],
    affine: Affine,
    field: Vec<f32>,
}

pub struct HttpSegmenter {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSegmenter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn post<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<InferenceResponse, TaskError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.endpoint))
            .json(body)
            .send()
            .await
            .map_err(|e| TaskError::Inference(format!("engine request failed: {e}")))?;
        let response = response
            .error_for_status()
            .map_err(|e| TaskError::Inference(format!("engine returned error: {e}")))?;
        response
            .json()
            .await
            .map_err(|e| TaskError::Inference(format!("engine response unreadable: {e}")))
    }
}

#[async_trait]
impl Segmenter for HttpSegmenter {
    async fn infer_point(
        &self,
        image: &Path,
        points: &[[f64; 3]],
        polarities: &[Polarity],
        target_label: i16,
        device: &str,
    ) -> Result<SegmentationResult, TaskError> {
        let request = PointRequest {
            image,
            points,
            point_labels: polarities
                .iter()
                .map(|p| match p {
                    Polarity::Positive => 1,
                    Polarity::Negative => 0,
                })
                .collect(),
            prompt_class: [target_label],
            device,
        };
        let response = self.post("infer", &request).await?;
        Ok(SegmentationResult {
            target_label,
            shape: response.shape,
            affine: response.affine,
            field: response.field,
        })
    }

    async fn infer_full(
        &self,
        image: &Path,
        label_catalog: &[i16],
        device: &str,
    ) -> Result<SegmentationResult, TaskError> {
        let request = FullRequest {
            image,
            label_prompt: label_catalog,
            device,
        };
        let response = self.post("infer_full", &request).await?;
        Ok(SegmentationResult {
            target_label: 0,
            shape: response.shape,
            affine: response.affine,
            field: response.field,
        })
    }

    async fn invalidate_cache(&self) {
        // Best-effort: a cold cache is the safe state on any failure.
        let _ = self
            .client
            .post(format!("{}/cache/invalidate", self.endpoint))
            .send()
            .await;
    }
}
