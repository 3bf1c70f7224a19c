//! Driven ports for the status indicator.

use crate::error::StatusResult;

/// Digital output lines.
pub trait GpioOutput: Send {
    /// Make `pin` usable as an output. Repeating the call is harmless.
    fn configure_output(&mut self, pin: u32) -> StatusResult<()>;

    fn write(&mut self, pin: u32, high: bool) -> StatusResult<()>;
}
