//! Core primitives.
//!
//! Injectable time and randomness. Nothing in `game/` reads the system
//! clock or an ambient RNG; both arrive through these traits.

pub mod clock;
pub mod rng;

// Re-export core types
pub use clock::{Clock, ManualClock, TokioClock};
pub use rng::{DeterministicRng, EntropyRng, RandomSource};
