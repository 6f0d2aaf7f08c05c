//! Game State Definitions
//!
//! The active round, its ledger, the lifetime statistics and the models
//! that drive them. `GameState` is the single owner of all of it; the
//! command methods here and the transitions in `tick.rs` are the only
//! ways it changes.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, EngineConfig};
use crate::core::rng::RandomSource;
use crate::game::events::{EngineEvent, EngineEventData};
use crate::game::hazard::CrashHazardModel;
use crate::game::ledger::{Bet, CashOut, CommandError, PlayerLedger};
use crate::game::multiplier::MultiplierModel;
use crate::game::stats::{StatsAggregator, StatsSnapshot};

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier (UUID as bytes).
///
/// Serialized as a hyphenated UUID string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(|u| Self(*u.as_bytes()))
    }

    /// Derive a stable id from an external identifier (session id, user id).
    pub fn from_external(external: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"crash-engine-player:");
        hasher.update(external.as_bytes());
        let hash = hasher.finalize();

        let mut id = [0u8; 16];
        id.copy_from_slice(&hash[..16]);
        Self(id)
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uuid_string())
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.to_uuid_string()
    }
}

impl TryFrom<String> for PlayerId {
    type Error = uuid::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        uuid::Uuid::parse_str(&s).map(|u| Self(*u.as_bytes()))
    }
}

// =============================================================================
// ROUND
// =============================================================================

/// Round lifecycle phase.
///
/// Always advances `Waiting -> Starting -> Flying -> Crashed -> Waiting`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    /// Between rounds; bets accepted.
    Waiting,
    /// Countdown to take-off; bets accepted.
    Starting,
    /// Multiplier rising; cash-outs accepted.
    Flying,
    /// Round over; showing the crash point.
    Crashed,
}

impl RoundPhase {
    /// Whether bets can be placed in this phase.
    #[inline]
    pub fn accepts_bets(self) -> bool {
        matches!(self, RoundPhase::Waiting | RoundPhase::Starting)
    }

    /// The only legal successor.
    pub fn next(self) -> RoundPhase {
        match self {
            RoundPhase::Waiting => RoundPhase::Starting,
            RoundPhase::Starting => RoundPhase::Flying,
            RoundPhase::Flying => RoundPhase::Crashed,
            RoundPhase::Crashed => RoundPhase::Waiting,
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            RoundPhase::Waiting => "waiting",
            RoundPhase::Starting => "starting",
            RoundPhase::Flying => "flying",
            RoundPhase::Crashed => "crashed",
        }
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The active round.
#[derive(Clone, Debug, PartialEq)]
pub struct Round {
    /// Sequential round number.
    pub id: u64,
    /// Current phase.
    pub phase: RoundPhase,
    /// Multiplier at the last tick (1.0 outside of flight).
    pub multiplier: f64,
    /// Engine time the round took off.
    pub started_at_ms: Option<u64>,
    /// Engine time of the last flying tick.
    pub last_tick_ms: Option<u64>,
    /// Crash point, once crashed.
    pub final_multiplier: Option<f64>,
    /// When the scheduler must next call `tick` (`None` = idle).
    pub deadline_ms: Option<u64>,
}

impl Round {
    /// Fresh round in WAITING with nothing scheduled.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            phase: RoundPhase::Waiting,
            multiplier: 1.0,
            started_at_ms: None,
            last_tick_ms: None,
            final_multiplier: None,
            deadline_ms: None,
        }
    }
}

/// Externally visible view of the round (`getCurrentState`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    /// Current phase.
    pub state: RoundPhase,
    /// Round number.
    pub game_id: u64,
    /// Current multiplier (FLYING only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub multiplier: Option<f64>,
    /// Seconds since take-off (FLYING only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub elapsed: Option<f64>,
    /// Crash point (CRASHED only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub final_multiplier: Option<f64>,
    /// Seconds until the countdown starts (WAITING only, when scheduled).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_round_in: Option<f64>,
    /// Seconds until take-off (STARTING only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub countdown: Option<f64>,
}

/// Aggregate statistics plus live round info (`getStats`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    /// Lifetime counters.
    #[serde(flatten)]
    pub totals: StatsSnapshot,
    /// Multiplier of the active round.
    pub current_multiplier: f64,
    /// Phase of the active round.
    pub game_state: RoundPhase,
    /// Number of bets in the active round.
    pub active_players: usize,
}

/// Internal invariant violation. Fatal for the current round only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineFault {
    /// A flying tick fired but the round has no take-off time.
    #[error("round {round_id} is flying without a start time")]
    MissingStartTime {
        /// Affected round.
        round_id: u64,
    },
    /// Crash settlement was attempted on an already settled round.
    #[error("round {round_id} settled twice")]
    DoubleSettlement {
        /// Affected round.
        round_id: u64,
    },
    /// A transition skipped or reversed a phase.
    #[error("round {round_id}: illegal transition {from} -> {to}")]
    IllegalTransition {
        /// Affected round.
        round_id: u64,
        /// Phase before.
        from: RoundPhase,
        /// Requested phase.
        to: RoundPhase,
    },
}

#[inline]
pub(crate) fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Complete engine state.
pub struct GameState {
    pub(crate) config: EngineConfig,
    /// Config waiting for the next WAITING phase.
    pub(crate) pending_config: Option<EngineConfig>,
    pub(crate) round: Round,
    pub(crate) ledger: PlayerLedger,
    pub(crate) stats: StatsAggregator,
    pub(crate) growth: MultiplierModel,
    pub(crate) hazard: CrashHazardModel,
    pub(crate) rng: Box<dyn RandomSource>,
    /// Events raised since the last `take_events`.
    events: Vec<EngineEvent>,
    next_seq: u64,
}

impl fmt::Debug for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameState")
            .field("round", &self.round)
            .field("bets", &self.ledger.len())
            .field("pending_config", &self.pending_config.is_some())
            .finish_non_exhaustive()
    }
}

impl GameState {
    /// Create an idle engine. Nothing is scheduled until `tick::begin`.
    pub fn new(
        config: EngineConfig,
        rng: Box<dyn RandomSource>,
        now_ms: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            ledger: PlayerLedger::new(config.min_auto_cash_out),
            stats: StatsAggregator::new(config.history_capacity, now_ms),
            growth: MultiplierModel::new(config.growth),
            hazard: CrashHazardModel::new(config.hazard.clone()),
            config,
            pending_config: None,
            round: Round::new(1),
            rng,
            events: Vec::new(),
            next_seq: 0,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Active round.
    pub fn round(&self) -> &Round {
        &self.round
    }

    /// Phase of the active round.
    pub fn phase(&self) -> RoundPhase {
        self.round.phase
    }

    /// Bets of the active round.
    pub fn ledger(&self) -> &PlayerLedger {
        &self.ledger
    }

    /// When the scheduler should next call `tick`, if anything is scheduled.
    pub fn next_wake_ms(&self) -> Option<u64> {
        self.round.deadline_ms
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Place a bet in the active round.
    pub fn place_bet(
        &mut self,
        player_id: PlayerId,
        amount: f64,
        auto_cash_out: Option<f64>,
    ) -> Result<Bet, CommandError> {
        let bet = self
            .ledger
            .place_bet(self.round.phase, player_id, amount, auto_cash_out)?
            .clone();
        self.stats.add_bet(amount);

        debug!(
            round = self.round.id,
            player = %player_id.short(),
            amount,
            auto_cash_out = ?auto_cash_out,
            "bet placed"
        );
        Ok(bet)
    }

    /// Withdraw a bet before take-off.
    pub fn cancel_bet(&mut self, player_id: &PlayerId) -> Result<Bet, CommandError> {
        let bet = self.ledger.cancel_bet(self.round.phase, player_id)?;
        self.stats.remove_bet(bet.amount);

        debug!(round = self.round.id, player = %player_id.short(), "bet withdrawn");
        Ok(bet)
    }

    /// Manual cash-out at the multiplier of the last tick.
    ///
    /// That tick's auto cash-out scan has already run, so a bet whose
    /// threshold was reached is already cashed out and this returns
    /// `AlreadyCashedOut`.
    pub fn cash_out(&mut self, player_id: &PlayerId) -> Result<CashOut, CommandError> {
        let cash = self
            .ledger
            .cash_out(self.round.phase, player_id, self.round.multiplier)?;
        self.stats.add_payout(cash.payout);

        debug!(
            round = self.round.id,
            player = %player_id.short(),
            multiplier = cash.multiplier,
            payout = cash.payout,
            "cash out"
        );
        Ok(cash)
    }

    /// Stage a new configuration for the next round.
    pub fn stage_config(&mut self, config: EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;
        info!(round = self.round.id, "config staged for next round");
        self.pending_config = Some(config);
        Ok(())
    }

    /// Swap in a staged config. Only called when a WAITING phase begins.
    pub(crate) fn apply_pending_config(&mut self) {
        let Some(config) = self.pending_config.take() else {
            return;
        };

        self.growth = MultiplierModel::new(config.growth);
        self.hazard = CrashHazardModel::new(config.hazard.clone());
        self.ledger.set_min_auto_cash_out(config.min_auto_cash_out);
        self.stats.set_history_capacity(config.history_capacity);
        self.config = config;

        info!(round = self.round.id, "staged config applied");
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current round view at engine time `now_ms`.
    pub fn snapshot(&self, now_ms: u64) -> RoundSnapshot {
        let round = &self.round;
        let remaining = || round.deadline_ms.map(|d| ms_to_secs(d.saturating_sub(now_ms)));

        let mut snapshot = RoundSnapshot {
            state: round.phase,
            game_id: round.id,
            multiplier: None,
            elapsed: None,
            final_multiplier: None,
            next_round_in: None,
            countdown: None,
        };

        match round.phase {
            RoundPhase::Waiting => snapshot.next_round_in = remaining(),
            RoundPhase::Starting => snapshot.countdown = remaining(),
            RoundPhase::Flying => {
                snapshot.multiplier = Some(round.multiplier);
                snapshot.elapsed = Some(
                    round
                        .started_at_ms
                        .map(|s| ms_to_secs(now_ms.saturating_sub(s)))
                        .unwrap_or(0.0),
                );
            }
            RoundPhase::Crashed => snapshot.final_multiplier = round.final_multiplier,
        }

        snapshot
    }

    /// Past crash points, most recent first.
    pub fn history(&self) -> Vec<f64> {
        self.stats.history().to_vec()
    }

    /// Aggregate statistics at engine time `now_ms`.
    pub fn stats(&self, now_ms: u64) -> EngineStats {
        EngineStats {
            totals: self.stats.snapshot(now_ms),
            current_multiplier: self.round.multiplier,
            game_state: self.round.phase,
            active_players: self.ledger.len(),
        }
    }

    /// Players with a bet in the active round.
    pub fn active_players(&self) -> Vec<PlayerId> {
        self.ledger.active_players()
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Queue an event with the next sequence number.
    pub(crate) fn push_event(&mut self, data: EngineEventData) {
        self.next_seq += 1;
        self.events.push(EngineEvent::new(self.next_seq, self.round.id, data));
    }

    /// Queue a `game_state_changed` for the current round view.
    pub(crate) fn push_state_changed(&mut self, now_ms: u64) {
        let snapshot = self.snapshot(now_ms);
        self.push_event(EngineEventData::GameStateChanged(snapshot));
    }

    /// Drain queued events.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;

    fn new_state() -> GameState {
        GameState::new(EngineConfig::default(), Box::new(DeterministicRng::new(1)), 0).unwrap()
    }

    #[test]
    fn test_player_id_uuid_roundtrip() {
        let id = PlayerId::from_external("socket-abc");
        let parsed = PlayerId::from_uuid_str(&id.to_uuid_string()).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(PlayerId::from_external("socket-abc"), id);
        assert_ne!(PlayerId::from_external("socket-abd"), id);
    }

    #[test]
    fn test_player_id_serializes_as_uuid() {
        let id = PlayerId::new([0xab; 16]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abababab-abab-abab-abab-abababababab\"");
        let back: PlayerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_phase_cycle() {
        let mut phase = RoundPhase::Waiting;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(phase);
            phase = phase.next();
        }
        assert_eq!(phase, RoundPhase::Waiting);
        assert_eq!(
            seen,
            vec![RoundPhase::Waiting, RoundPhase::Starting, RoundPhase::Flying, RoundPhase::Crashed]
        );
    }

    #[test]
    fn test_new_state_is_idle() {
        let state = new_state();
        assert_eq!(state.phase(), RoundPhase::Waiting);
        assert_eq!(state.next_wake_ms(), None);

        let snap = state.snapshot(0);
        assert_eq!(snap.game_id, 1);
        assert_eq!(snap.next_round_in, None);
    }

    #[test]
    fn test_place_bet_counts_volume() {
        let mut state = new_state();
        let id = PlayerId::new([1; 16]);

        state.place_bet(id, 25.0, Some(2.0)).unwrap();
        assert_eq!(state.active_players(), vec![id]);
        assert_eq!(state.stats(0).totals.total_bets, 25.0);

        state.cancel_bet(&id).unwrap();
        assert!(state.active_players().is_empty());
        assert_eq!(state.stats(0).totals.total_bets, 0.0);
    }

    #[test]
    fn test_cash_out_outside_flight() {
        let mut state = new_state();
        let id = PlayerId::new([1; 16]);
        state.place_bet(id, 25.0, None).unwrap();

        assert_eq!(state.cash_out(&id).unwrap_err(), CommandError::RoundNotFlying);
    }

    #[test]
    fn test_stage_config_rejects_invalid() {
        let mut state = new_state();
        let bad = EngineConfig {
            tick_period_ms: 0,
            ..Default::default()
        };
        assert!(state.stage_config(bad).is_err());
        assert!(state.pending_config.is_none());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let state = new_state();
        let json = serde_json::to_value(state.snapshot(0)).unwrap();
        assert_eq!(json["state"], "waiting");
        assert_eq!(json["gameId"], 1);
        assert!(json.get("multiplier").is_none());
    }
}
