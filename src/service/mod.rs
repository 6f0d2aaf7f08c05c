//! Service Layer
//!
//! The only part of the crate that owns timers and tasks. Wraps the pure
//! engine in `game/` with a real-time scheduler, an outbound event bus and
//! the JSON protocol used by the network layer.

pub mod bus;
pub mod protocol;
pub mod scheduler;

pub use bus::{BroadcastBus, EventBus, DEFAULT_BUS_CAPACITY};
pub use protocol::{dispatch, BetResponse, CashOutResponse, ClientCommand, ServerReply};
pub use scheduler::{RoundScheduler, SchedulerError};
