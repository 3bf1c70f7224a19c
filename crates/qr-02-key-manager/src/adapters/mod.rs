//! Adapters for the serial channel port.

pub mod mock;
pub mod tty;

pub use mock::{ModuleProbe, SimulatedSecureModule};
pub use tty::{TtyConfig, TtySerialChannel};
