//! # qr-05-lottery-client
//!
//! Coordinator client. Holds one TCP link to the coordinator, frames
//! messages with a `#C` terminator and drives the round protocol:
//!
//! - login with the primary slot, then register the remaining wallets
//! - query the round schedule and report when the commitment is due
//! - send the `lotteryStart` commitment with the batch signature
//! - stream the winning slot's random block back in numbered chunks
//!
//! Timers are owned by the runtime; the client reports what to schedule
//! through [`ClientEvent`].

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{FixedClock, MockConnector, SystemClock, TcpConnector};
pub use config::LotteryClientConfig;
pub use domain::{
    deadline_delay, parse_round_time, InboundMessage, LotteryPhase, RevealChunk, StreamerState,
};
pub use error::{LotteryClientError, LotteryClientResult};
pub use ports::{ConnectionId, CoordinatorConnector, CoordinatorLink, LinkEvent, WallClock};
pub use service::{ClientEvent, ConnectionState, LotteryClient};
