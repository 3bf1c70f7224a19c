//! # Event Loop Wiring
//!
//! The timer queue and the orchestrator that connects every component.
//!
//! ```text
//! link events ──┐
//! wireless ─────┼──→ Appliance::turn ──→ one handler ──→ components
//! timers ───────┘                            │
//!                                            └──→ re-arm / cancel timers
//! ```

pub mod orchestrator;
pub mod timers;

pub use orchestrator::{Appliance, Exit};
pub use timers::{TimerId, TimerQueue};

#[cfg(test)]
mod tests;
