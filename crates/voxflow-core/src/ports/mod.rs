//! Ports - the abstraction layer between the orchestration core and its
//! external collaborators (inference engine, volume codec, wall clock).

pub mod clock;
pub mod segmenter;
pub mod volume_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::segmenter::{Polarity, SegmentationResult, Segmenter};
pub use self::volume_store::VolumeStore;
