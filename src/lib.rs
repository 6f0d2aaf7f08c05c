//! # Crash Engine
//!
//! Round-lifecycle engine for a real-time multiplayer crash game: a shared
//! multiplier climbs from 1.0x until it crashes, and players cash out
//! before it does.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        CRASH ENGINE                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  core/            - Injectable primitives                    │
//! │  ├── rng.rs       - Xorshift128+ and OS-seeded randomness    │
//! │  └── clock.rs     - Tokio-backed and manual clocks           │
//! │                                                              │
//! │  game/            - Round engine (synchronous, no I/O)       │
//! │  ├── multiplier.rs- Growth curve                             │
//! │  ├── hazard.rs    - Per-tick crash probability               │
//! │  ├── ledger.rs    - Bets, cash-outs, settlement              │
//! │  ├── stats.rs     - Crash history and totals                 │
//! │  ├── state.rs     - Round state, commands and queries        │
//! │  ├── events.rs    - Outbound events                          │
//! │  └── tick.rs      - Round state machine                      │
//! │                                                              │
//! │  service/         - Real-time wrapper (tokio)                │
//! │  ├── scheduler.rs - Timer loop, serialized commands          │
//! │  ├── bus.rs       - Event publication                        │
//! │  └── protocol.rs  - JSON commands and replies                │
//! │                                                              │
//! │  config.rs        - Engine configuration                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Round lifecycle
//!
//! `WAITING -> STARTING -> FLYING -> CRASHED -> WAITING`. Bets are taken in
//! WAITING and STARTING, cash-outs only in FLYING. Every transition takes
//! the current time as an argument, so `game/` can be driven tick by tick
//! in tests with a seeded [`DeterministicRng`] and reproduce a round
//! exactly.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod service;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig};
pub use crate::core::clock::{Clock, ManualClock, TokioClock};
pub use crate::core::rng::{DeterministicRng, EntropyRng, RandomSource};
pub use game::events::{EngineEvent, EngineEventData};
pub use game::ledger::{CashOut, CommandError};
pub use game::state::{EngineStats, GameState, PlayerId, RoundPhase, RoundSnapshot};
pub use service::{BroadcastBus, EventBus, RoundScheduler, SchedulerError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default FLYING tick period in milliseconds (~60 Hz)
pub const DEFAULT_TICK_PERIOD_MS: u64 = 16;
