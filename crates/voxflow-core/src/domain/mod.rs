//! Domain model (descriptors, volumes, ROI records, outcomes, errors).

pub mod descriptor;
pub mod errors;
pub mod outcome;
pub mod roi;
pub mod volume;

pub use self::descriptor::{
    DESCRIPTOR_EXTENSION, PromptSpec, RawDescriptor, RawPrompt, SegmentationKind,
    SegmentationRequest, TaskDescriptor,
};
pub use self::errors::TaskError;
pub use self::outcome::ResultRecord;
pub use self::roi::{ROI_PALETTE, RoiEntry, RoiRegistry};
pub use self::volume::{Affine, IDENTITY_AFFINE, LabelVolume};
