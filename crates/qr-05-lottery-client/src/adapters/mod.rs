//! Adapters for the coordinator client.

pub mod clock;
pub mod mock;
pub mod tcp;

pub use clock::SystemClock;
pub use mock::{FixedClock, MockConnector};
pub use tcp::TcpConnector;
