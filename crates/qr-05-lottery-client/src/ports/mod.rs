//! Ports for the coordinator client.

pub mod outbound;

pub use outbound::{ConnectionId, CoordinatorConnector, CoordinatorLink, LinkEvent, WallClock};
