//! Task descriptor model.
//!
//! Two representations exist on purpose:
//! - [`RawDescriptor`] is a permissive serde mirror of the on-disk JSON.
//!   Anything that is valid JSON parses into it, so the validator can report
//!   a precise reason instead of an opaque deserialization error.
//! - [`TaskDescriptor`] is the validated form, with the segmentation kind
//!   decided as a tagged variant at the boundary. Downstream code never sees
//!   an unknown `segmentation_type`.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Extension of descriptor files in the watched directory.
pub const DESCRIPTOR_EXTENSION: &str = "tsk";

/// On-disk descriptor, before validation. All fields optional so a partial
/// file still parses and gets a readable validation reason.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDescriptor {
    pub task_id: Option<String>,
    pub input_file: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub segmentation_type: Option<String>,
    #[serde(default)]
    pub segmentation_prompts: Vec<RawPrompt>,
}

/// On-disk prompt spec, before validation. Point coordinates stay as raw
/// JSON values until the validator has checked arity and numeric type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPrompt {
    pub target_output_label: Option<serde_json::Value>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub positive_points: Vec<serde_json::Value>,
    #[serde(default)]
    pub negative_points: Vec<serde_json::Value>,
    pub physical_center_of_box: Option<serde_json::Value>,
}

/// The two supported segmentation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationKind {
    Full,
    Point,
}

impl SegmentationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentationKind::Full => "full",
            SegmentationKind::Point => "point",
        }
    }
}

impl fmt::Display for SegmentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labeled region request, immutable once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSpec {
    pub target_output_label: i16,
    pub display_name: Option<String>,
    pub positive_points: Vec<[f64; 3]>,
    pub negative_points: Vec<[f64; 3]>,
    /// Change-detection fingerprint, in physical (transform-space) units.
    pub physical_center_of_box: Option<[f64; 3]>,
}

impl PromptSpec {
    /// Display name, defaulting like the engine's own labeling.
    pub fn name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| format!("Label {}", self.target_output_label))
    }

    pub fn point_count(&self) -> usize {
        self.positive_points.len() + self.negative_points.len()
    }
}

/// What kind of work the descriptor asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentationRequest {
    /// Segment the entire label catalog in one engine call.
    Full,
    /// Segment the listed prompts, in order.
    Point(Vec<PromptSpec>),
}

impl SegmentationRequest {
    pub fn kind(&self) -> SegmentationKind {
        match self {
            SegmentationRequest::Full => SegmentationKind::Full,
            SegmentationRequest::Point(_) => SegmentationKind::Point,
        }
    }
}

/// A validated unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDescriptor {
    pub task_id: String,
    pub input_file: PathBuf,
    pub output_directory: PathBuf,
    pub request: SegmentationRequest,
}

impl TaskDescriptor {
    pub fn kind(&self) -> SegmentationKind {
        self.request.kind()
    }
}
