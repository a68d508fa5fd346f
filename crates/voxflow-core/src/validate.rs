//! Descriptor validation.
//!
//! Checks run in a fixed order and the first failure short-circuits with a
//! human-readable reason; nothing partial escapes. On success the raw
//! descriptor becomes the tagged [`TaskDescriptor`], so an unknown
//! `segmentation_type` can never reach the processing pipeline.

use serde_json::Value;

use crate::domain::{
    PromptSpec, RawDescriptor, RawPrompt, SegmentationKind, SegmentationRequest, TaskDescriptor,
    TaskError,
};

/// Validate a raw descriptor into a typed one.
///
/// `default_kind` is used when `segmentation_type` is absent (configured;
/// the service default is `full`).
pub fn validate(
    raw: RawDescriptor,
    default_kind: SegmentationKind,
) -> Result<TaskDescriptor, TaskError> {
    let task_id = raw
        .task_id
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| reason("Missing required field: task_id"))?;
    let input_file = raw
        .input_file
        .clone()
        .ok_or_else(|| reason("Missing required field: input_file"))?;
    let output_directory = raw
        .output_directory
        .clone()
        .ok_or_else(|| reason("Missing required field: output_directory"))?;

    if !input_file.exists() {
        return Err(reason(format!(
            "Input file does not exist: {}",
            input_file.display()
        )));
    }

    let kind = match raw.segmentation_type.as_deref() {
        None => default_kind,
        Some("full") => SegmentationKind::Full,
        Some("point") => SegmentationKind::Point,
        Some(other) => {
            return Err(reason(format!("Invalid segmentation type: {other}")));
        }
    };

    let request = match kind {
        SegmentationKind::Full => SegmentationRequest::Full,
        SegmentationKind::Point => {
            if raw.segmentation_prompts.is_empty() {
                return Err(reason(
                    "'segmentation_prompts' must be a non-empty list for point segmentation",
                ));
            }
            let prompts = raw
                .segmentation_prompts
                .iter()
                .enumerate()
                .map(|(i, p)| validate_prompt(i, p))
                .collect::<Result<Vec<_>, _>>()?;
            SegmentationRequest::Point(prompts)
        }
    };

    Ok(TaskDescriptor {
        task_id,
        input_file,
        output_directory,
        request,
    })
}

fn validate_prompt(index: usize, raw: &RawPrompt) -> Result<PromptSpec, TaskError> {
    let target_output_label = match raw.target_output_label.as_ref().and_then(Value::as_i64) {
        Some(v) if v > 0 && v <= i16::MAX as i64 => v as i16,
        _ => {
            return Err(reason(format!(
                "Missing or invalid 'target_output_label' (must be a positive integer) \
                 in prompt spec at index {index}"
            )));
        }
    };

    if raw.positive_points.is_empty() && raw.negative_points.is_empty() {
        return Err(reason(format!(
            "At least one positive or negative point must be provided for prompt spec \
             at index {index} (target_label: {target_output_label})"
        )));
    }

    let positive_points = parse_points("positive_points", index, &raw.positive_points)?;
    let negative_points = parse_points("negative_points", index, &raw.negative_points)?;

    // The center is only a change-detection fingerprint; a malformed one is
    // treated as absent, matching how the registry handles missing centers.
    let physical_center_of_box = raw.physical_center_of_box.as_ref().and_then(parse_triple);

    Ok(PromptSpec {
        target_output_label,
        display_name: raw.display_name.clone(),
        positive_points,
        negative_points,
        physical_center_of_box,
    })
}

fn parse_points(
    field: &str,
    prompt_index: usize,
    values: &[Value],
) -> Result<Vec<[f64; 3]>, TaskError> {
    values
        .iter()
        .map(|v| {
            parse_triple(v).ok_or_else(|| {
                reason(format!(
                    "Each point in '{field}' must be a list of 3 numbers (x,y,z) \
                     in prompt spec at index {prompt_index}"
                ))
            })
        })
        .collect()
}

fn parse_triple(value: &Value) -> Option<[f64; 3]> {
    let arr = value.as_array()?;
    if arr.len() != 3 {
        return None;
    }
    let mut out = [0.0; 3];
    for (slot, v) in out.iter_mut().zip(arr) {
        *slot = v.as_f64()?;
    }
    Some(out)
}

fn reason(msg: impl Into<String>) -> TaskError {
    TaskError::Validation(msg.into())
}
