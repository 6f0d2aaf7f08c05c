//! Engine Events
//!
//! Outbound notifications, raised in strict order while the state is
//! mutated and handed to the event bus afterwards. Each event carries a
//! sequence number that increases by one per event for the engine's
//! lifetime.

use serde::{Deserialize, Serialize};

use crate::game::ledger::{Bet, CashOut};
use crate::game::state::RoundSnapshot;

/// Event payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum EngineEventData {
    /// Phase transition, or one FLYING tick.
    GameStateChanged(RoundSnapshot),
    /// The engine cashed a player out at their threshold.
    PlayerAutoCashedOut(CashOut),
    /// The round was abandoned before settling; riding stakes are refunded.
    RoundVoided(VoidedRound),
}

/// Bets refunded when a round is abandoned (engine stop or fault).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoidedRound {
    /// Bets that had not cashed out, in placement order.
    pub refunds: Vec<Bet>,
    /// Sum of refunded stakes.
    pub total_refunded: f64,
}

impl VoidedRound {
    /// Collect refunds for the given bets.
    pub fn new(refunds: Vec<Bet>) -> Self {
        let total_refunded = refunds.iter().map(|bet| bet.amount).sum();
        Self { refunds, total_refunded }
    }
}

/// An event with ordering metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    /// Engine-wide sequence number, starting at 1.
    pub seq: u64,
    /// Round the event belongs to.
    pub round_id: u64,
    /// Payload.
    #[serde(flatten)]
    pub data: EngineEventData,
}

impl EngineEvent {
    /// Create a new event.
    pub fn new(seq: u64, round_id: u64, data: EngineEventData) -> Self {
        Self { seq, round_id, data }
    }

    /// Wire name, e.g. `game_state_changed`.
    pub fn name(&self) -> &'static str {
        match self.data {
            EngineEventData::GameStateChanged(_) => "game_state_changed",
            EngineEventData::PlayerAutoCashedOut(_) => "player_auto_cashed_out",
            EngineEventData::RoundVoided(_) => "round_voided",
        }
    }

    /// Round view, if this is a state change.
    pub fn as_state_change(&self) -> Option<&RoundSnapshot> {
        match &self.data {
            EngineEventData::GameStateChanged(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// Cash-out, if this is an auto cash-out.
    pub fn as_auto_cash_out(&self) -> Option<&CashOut> {
        match &self.data {
            EngineEventData::PlayerAutoCashedOut(cash) => Some(cash),
            _ => None,
        }
    }

    /// Refunds, if this round was voided.
    pub fn as_round_voided(&self) -> Option<&VoidedRound> {
        match &self.data {
            EngineEventData::RoundVoided(voided) => Some(voided),
            _ => None,
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
