//! Domain layer for the coordinator client.

pub mod codec;
pub mod inbound;
pub mod outbound;
pub mod schedule;
pub mod streamer;

pub use codec::{encode_frame, FrameDecoder, FRAME_TERMINATOR};
pub use inbound::{InboundMessage, LotteryPhase};
pub use outbound::{
    commitment_request, login_request, register_request, reveal_response, schedule_request,
    CommitmentEntry, RegisteredWallet,
};
pub use schedule::{deadline_delay, parse_round_time, seconds_until, ROUND_TIME_FORMAT};
pub use streamer::{PacketStreamer, RequestOutcome, RevealChunk, StreamerState};
