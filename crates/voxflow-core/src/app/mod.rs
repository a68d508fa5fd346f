//! Application layer - configuration, claim tracking, task execution, and
//! the polling dispatcher.

pub mod active_set;
pub mod config;
pub mod dir_locks;
pub mod dispatcher;
pub mod worker;

pub use self::active_set::{ActiveTaskSet, ClaimGuard};
pub use self::config::{MASK_FILE_NAME, ServiceConfig};
pub use self::dir_locks::OutputDirLocks;
pub use self::dispatcher::{Dispatcher, SCAN_ERROR_BACKOFF_FACTOR};
pub use self::worker::TaskRunner;
