//! Filesystem-backed stores: descriptors, the per-directory ROI registry
//! file, and the per-descriptor result record.

pub mod descriptor;
pub mod recorder;
pub mod registry;

pub use self::descriptor::{ArchiveStatus, DescriptorStore};
pub use self::recorder::ResultRecorder;
pub use self::registry::{REGISTRY_FILE_NAME, RegistryStore};
