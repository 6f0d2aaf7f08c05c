//! Game Logic Module
//!
//! Everything that decides what happens in a round. No I/O, no timers:
//! callers pass in the current engine time and receive events back.
//!
//! ## Module Structure
//!
//! - `multiplier`: Multiplier growth curve
//! - `hazard`: Per-tick crash probability
//! - `ledger`: Bets, cash-outs and settlement for one round
//! - `stats`: Crash history and lifetime counters
//! - `state`: Round and engine state, commands and queries
//! - `tick`: Round state machine
//! - `events`: Outbound engine events

pub mod events;
pub mod hazard;
pub mod ledger;
pub mod multiplier;
pub mod state;
pub mod stats;
pub mod tick;

// Re-export key types
pub use events::{EngineEvent, EngineEventData, VoidedRound};
pub use hazard::{CrashHazardModel, HazardParams, HazardTier};
pub use ledger::{Bet, CashOut, CommandError, PlayerLedger, Settlement, MIN_AUTO_CASH_OUT};
pub use multiplier::{GrowthMode, MultiplierModel};
pub use state::{EngineFault, EngineStats, GameState, PlayerId, Round, RoundPhase, RoundSnapshot};
pub use stats::{History, StatsAggregator, StatsSnapshot};
pub use tick::TickResult;
