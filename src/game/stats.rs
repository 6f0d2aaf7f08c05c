//! Round History and Aggregate Statistics
//!
//! The only state that outlives a round. Written at crash time (history,
//! game count) and on bet/cash-out (cumulative volume).

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of crash points kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Round a multiplier to display precision (two decimals).
#[inline]
pub fn round_multiplier(multiplier: f64) -> f64 {
    (multiplier * 100.0).round() / 100.0
}

/// Bounded crash-point history, most recent first.
#[derive(Clone, Debug, PartialEq)]
pub struct History {
    entries: VecDeque<f64>,
    capacity: usize,
}

impl History {
    /// Empty history holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new crash point at the front, evicting the oldest on overflow.
    pub fn push(&mut self, final_multiplier: f64) {
        self.entries.push_front(round_multiplier(final_multiplier));
        self.entries.truncate(self.capacity);
    }

    /// Change capacity, dropping the oldest entries if it shrinks.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.entries.truncate(capacity);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No rounds recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent crash point.
    pub fn latest(&self) -> Option<f64> {
        self.entries.front().copied()
    }

    /// Mean of the kept entries.
    pub fn mean(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.entries.iter().sum::<f64>() / self.entries.len() as f64)
    }

    /// Entries, most recent first.
    pub fn to_vec(&self) -> Vec<f64> {
        self.entries.iter().copied().collect()
    }
}

/// Point-in-time aggregate statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Rounds that reached CRASHED.
    pub total_games: u64,
    /// Sum of all placed stakes.
    pub total_bets: f64,
    /// Sum of all manual and automatic cash-out payouts.
    pub total_payouts: f64,
    /// Mean crash point over the kept history.
    pub average_multiplier: f64,
    /// Engine uptime.
    pub uptime_ms: u64,
    /// Wall-clock time the engine was created.
    pub started_at: DateTime<Utc>,
}

/// History plus lifetime counters.
#[derive(Clone, Debug)]
pub struct StatsAggregator {
    history: History,
    total_games: u64,
    total_bets: f64,
    total_payouts: f64,
    average_multiplier: f64,
    created_ms: u64,
    started_at: DateTime<Utc>,
}

impl StatsAggregator {
    /// Start aggregating at engine time `now_ms`.
    pub fn new(history_capacity: usize, now_ms: u64) -> Self {
        Self {
            history: History::new(history_capacity),
            total_games: 0,
            total_bets: 0.0,
            total_payouts: 0.0,
            average_multiplier: 0.0,
            created_ms: now_ms,
            started_at: Utc::now(),
        }
    }

    /// Record a crashed round.
    pub fn record(&mut self, final_multiplier: f64) {
        self.history.push(final_multiplier);
        self.total_games += 1;
        self.average_multiplier = self.history.mean().unwrap_or(0.0);
    }

    /// Count a placed stake.
    pub fn add_bet(&mut self, amount: f64) {
        self.total_bets += amount;
    }

    /// Remove a withdrawn stake.
    pub fn remove_bet(&mut self, amount: f64) {
        self.total_bets = (self.total_bets - amount).max(0.0);
    }

    /// Count a cash-out payout.
    pub fn add_payout(&mut self, payout: f64) {
        self.total_payouts += payout;
    }

    /// Crash-point history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Resize the history (config hot swap).
    pub fn set_history_capacity(&mut self, capacity: usize) {
        self.history.set_capacity(capacity);
        self.average_multiplier = self.history.mean().unwrap_or(0.0);
    }

    /// Snapshot at engine time `now_ms`.
    pub fn snapshot(&self, now_ms: u64) -> StatsSnapshot {
        StatsSnapshot {
            total_games: self.total_games,
            total_bets: self.total_bets,
            total_payouts: self.total_payouts,
            average_multiplier: self.average_multiplier,
            uptime_ms: now_ms.saturating_sub(self.created_ms),
            started_at: self.started_at,
        }
    }
}
