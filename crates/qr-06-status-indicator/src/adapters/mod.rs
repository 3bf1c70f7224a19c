//! Adapters for the status indicator.

pub mod mock;
pub mod sysfs;

pub use mock::RecordingGpio;
pub use sysfs::SysfsGpio;
