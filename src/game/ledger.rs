//! Player Ledger
//!
//! Round-scoped bet bookkeeping. A ledger belongs to exactly one round;
//! [`PlayerLedger::settle`] finalizes it and leaves it empty for the next.
//! Bets are kept in placement order so auto cash-outs resolve in a fixed
//! sequence every tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::state::{PlayerId, RoundPhase};

/// Smallest auto cash-out threshold a player may request.
pub const MIN_AUTO_CASH_OUT: f64 = 1.01;

/// Player-facing command rejection.
///
/// Every variant maps to a stable reason code the network layer can
/// branch on without knowing engine internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandError {
    /// Bets are only taken while waiting or counting down.
    #[error("round is not accepting bets")]
    RoundNotAccepting,
    /// One bet per player per round.
    #[error("bet already placed this round")]
    BetAlreadyPlaced,
    /// Auto cash-out threshold below the minimum.
    #[error("invalid auto cash-out threshold")]
    InvalidAutoCashout,
    /// Stake must be a positive, finite amount.
    #[error("invalid bet amount")]
    InvalidAmount,
    /// Cash-outs and forced crashes need a round in flight.
    #[error("round is not flying")]
    RoundNotFlying,
    /// Player has no bet in this round.
    #[error("no active bet found")]
    NoActiveBet,
    /// Bet was already cashed out (manually or automatically).
    #[error("already cashed out")]
    AlreadyCashedOut,
}

impl CommandError {
    /// Stable reason code, e.g. `ROUND_NOT_ACCEPTING`.
    pub fn reason_code(&self) -> &'static str {
        match self {
            CommandError::RoundNotAccepting => "ROUND_NOT_ACCEPTING",
            CommandError::BetAlreadyPlaced => "BET_ALREADY_PLACED",
            CommandError::InvalidAutoCashout => "INVALID_AUTO_CASHOUT",
            CommandError::InvalidAmount => "INVALID_AMOUNT",
            CommandError::RoundNotFlying => "ROUND_NOT_FLYING",
            CommandError::NoActiveBet => "NO_ACTIVE_BET",
            CommandError::AlreadyCashedOut => "ALREADY_CASHED_OUT",
        }
    }
}

/// A single player's stake in the active round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    /// Owner of the bet.
    pub player_id: PlayerId,
    /// Stake.
    pub amount: f64,
    /// Multiplier at which the engine cashes out automatically.
    pub auto_cash_out: Option<f64>,
    /// Whether the bet has been cashed out.
    pub cashed_out: bool,
    /// Multiplier the bet was cashed out at.
    pub cashed_out_multiplier: Option<f64>,
}

impl Bet {
    /// Payout so far: `amount * multiplier` once cashed out, otherwise 0.
    pub fn payout(&self) -> f64 {
        self.cashed_out_multiplier
            .map(|m| self.amount * m)
            .unwrap_or(0.0)
    }
}

/// Result of a successful cash-out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CashOut {
    /// Player who cashed out.
    pub player_id: PlayerId,
    /// Multiplier locked in.
    pub multiplier: f64,
    /// `bet_amount * multiplier`.
    pub payout: f64,
    /// Original stake.
    pub bet_amount: f64,
    /// Triggered by the auto cash-out threshold rather than a request.
    pub automatic: bool,
}

/// Outcome of settling a crashed round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Players who cashed out in time.
    pub winners: Vec<PlayerId>,
    /// Players whose stake was lost.
    pub losers: Vec<PlayerId>,
    /// Sum of cash-out payouts.
    pub total_paid: f64,
    /// Sum of forfeited stakes.
    pub total_forfeited: f64,
}

/// Bets for the active round.
#[derive(Clone, Debug)]
pub struct PlayerLedger {
    /// Bets in placement order.
    bets: Vec<Bet>,
    /// Player -> index into `bets`.
    index: BTreeMap<PlayerId, usize>,
    /// Minimum accepted auto cash-out threshold.
    min_auto_cash_out: f64,
}

impl Default for PlayerLedger {
    fn default() -> Self {
        Self::new(MIN_AUTO_CASH_OUT)
    }
}

impl PlayerLedger {
    /// Create an empty ledger.
    pub fn new(min_auto_cash_out: f64) -> Self {
        Self {
            bets: Vec::new(),
            index: BTreeMap::new(),
            min_auto_cash_out,
        }
    }

    /// Change the minimum auto cash-out threshold (between rounds only).
    pub fn set_min_auto_cash_out(&mut self, min_auto_cash_out: f64) {
        self.min_auto_cash_out = min_auto_cash_out;
    }

    /// Place a bet for `player_id`.
    pub fn place_bet(
        &mut self,
        phase: RoundPhase,
        player_id: PlayerId,
        amount: f64,
        auto_cash_out: Option<f64>,
    ) -> Result<&Bet, CommandError> {
        if !phase.accepts_bets() {
            return Err(CommandError::RoundNotAccepting);
        }

        if let Some(threshold) = auto_cash_out {
            if !threshold.is_finite() || threshold < self.min_auto_cash_out {
                return Err(CommandError::InvalidAutoCashout);
            }
        }

        if !amount.is_finite() || amount <= 0.0 {
            return Err(CommandError::InvalidAmount);
        }

        if self.index.contains_key(&player_id) {
            return Err(CommandError::BetAlreadyPlaced);
        }

        let slot = self.bets.len();
        self.bets.push(Bet {
            player_id,
            amount,
            auto_cash_out,
            cashed_out: false,
            cashed_out_multiplier: None,
        });
        self.index.insert(player_id, slot);

        Ok(&self.bets[slot])
    }

    /// Withdraw a bet before the round takes off.
    ///
    /// Returns the withdrawn bet.
    pub fn cancel_bet(&mut self, phase: RoundPhase, player_id: &PlayerId) -> Result<Bet, CommandError> {
        if !phase.accepts_bets() {
            return Err(CommandError::RoundNotAccepting);
        }

        let slot = self.index.remove(player_id).ok_or(CommandError::NoActiveBet)?;
        let bet = self.bets.remove(slot);

        // Later bets shifted down by one
        for idx in self.index.values_mut() {
            if *idx > slot {
                *idx -= 1;
            }
        }

        Ok(bet)
    }

    /// Cash out every uncashed bet whose threshold has been reached.
    ///
    /// Runs in placement order. Each bet can trigger at most once.
    pub fn scan_auto_cash_outs(&mut self, multiplier: f64) -> Vec<CashOut> {
        let mut cashed = Vec::new();

        for bet in self.bets.iter_mut() {
            if bet.cashed_out {
                continue;
            }
            let Some(threshold) = bet.auto_cash_out else {
                continue;
            };
            if threshold <= multiplier {
                cashed.push(Self::execute(bet, multiplier, true));
            }
        }

        cashed
    }

    /// Manual cash-out at `multiplier`.
    pub fn cash_out(
        &mut self,
        phase: RoundPhase,
        player_id: &PlayerId,
        multiplier: f64,
    ) -> Result<CashOut, CommandError> {
        if phase != RoundPhase::Flying {
            return Err(CommandError::RoundNotFlying);
        }

        let slot = *self.index.get(player_id).ok_or(CommandError::NoActiveBet)?;
        let bet = &mut self.bets[slot];

        if bet.cashed_out {
            return Err(CommandError::AlreadyCashedOut);
        }

        Ok(Self::execute(bet, multiplier, false))
    }

    fn execute(bet: &mut Bet, multiplier: f64, automatic: bool) -> CashOut {
        bet.cashed_out = true;
        bet.cashed_out_multiplier = Some(multiplier);

        CashOut {
            player_id: bet.player_id,
            multiplier,
            payout: bet.amount * multiplier,
            bet_amount: bet.amount,
            automatic,
        }
    }

    /// Finalize the round: uncashed bets lose their stake, then clear.
    pub fn settle(&mut self) -> Settlement {
        let mut settlement = Settlement::default();

        for bet in self.bets.drain(..) {
            if bet.cashed_out {
                settlement.total_paid += bet.payout();
                settlement.winners.push(bet.player_id);
            } else {
                settlement.total_forfeited += bet.amount;
                settlement.losers.push(bet.player_id);
            }
        }
        self.index.clear();

        settlement
    }

    /// Drop every bet without settling (round abandoned).
    ///
    /// Returns the bets that were still riding, whose stakes go back to the
    /// players. Cashed-out bets already have their payout and are dropped.
    pub fn void_all(&mut self) -> Vec<Bet> {
        self.index.clear();
        self.bets.drain(..).filter(|bet| !bet.cashed_out).collect()
    }

    /// Bet for a player, if any.
    pub fn get(&self, player_id: &PlayerId) -> Option<&Bet> {
        self.index.get(player_id).map(|&slot| &self.bets[slot])
    }

    /// Players with a bet, in placement order.
    pub fn active_players(&self) -> Vec<PlayerId> {
        self.bets.iter().map(|bet| bet.player_id).collect()
    }

    /// Number of bets.
    pub fn len(&self) -> usize {
        self.bets.len()
    }

    /// No bets placed.
    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }
}
