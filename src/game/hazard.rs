//! Crash Hazard
//!
//! Decides, once per tick, whether the round crashes now. The model is a
//! continuous-time hazard rate converted to a per-tick probability:
//!
//! ```text
//! λ(m, t) = base(m) + max(0, t - grace) * time_penalty
//! p_tick  = 1 - e^(-λ · Δt)
//! ```
//!
//! Because `1 - e^(-λΔt)` composes multiplicatively, splitting a tick in
//! two gives the same survival probability as one tick of twice the
//! length, so the crash-time distribution does not depend on tick rate.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::core::rng::RandomSource;

/// One step of the base hazard curve.
///
/// Applies from `from_multiplier` up to the next tier:
/// `base + slope * (m - from_multiplier)` crashes per second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HazardTier {
    /// Lower multiplier bound of this tier (inclusive).
    pub from_multiplier: f64,
    /// Hazard rate at the lower bound, per second.
    pub base: f64,
    /// Additional hazard per 1.0x above the lower bound.
    #[serde(default)]
    pub slope: f64,
}

impl HazardTier {
    /// Tier with a flat rate.
    pub const fn flat(from_multiplier: f64, base: f64) -> Self {
        Self { from_multiplier, base, slope: 0.0 }
    }

    /// Tier whose rate rises linearly with the multiplier.
    pub const fn sloped(from_multiplier: f64, base: f64, slope: f64) -> Self {
        Self { from_multiplier, base, slope }
    }
}

/// Tunable economics of the crash curve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HazardParams {
    /// Tiers sorted by `from_multiplier`, ascending.
    pub tiers: Vec<HazardTier>,
    /// Flight seconds before the time penalty starts accruing.
    pub grace_period_secs: f64,
    /// Extra hazard per second of flight beyond the grace period.
    pub time_penalty: f64,
}

impl Default for HazardParams {
    fn default() -> Self {
        Self {
            tiers: vec![
                HazardTier::flat(1.0, 0.003),
                HazardTier::flat(1.5, 0.02),
                HazardTier::sloped(2.0, 0.05, 0.02),
                HazardTier::sloped(5.0, 0.12, 0.04),
            ],
            grace_period_secs: 2.0,
            time_penalty: 0.01,
        }
    }
}

impl HazardParams {
    /// Check tier ordering and sign constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let first = self
            .tiers
            .first()
            .ok_or_else(|| ConfigError::InvalidHazard("at least one tier is required".into()))?;
        if first.from_multiplier > 1.0 {
            return Err(ConfigError::InvalidHazard(format!(
                "first tier must start at or below 1.0x, starts at {}",
                first.from_multiplier
            )));
        }
        for pair in self.tiers.windows(2) {
            if pair[1].from_multiplier <= pair[0].from_multiplier {
                return Err(ConfigError::InvalidHazard(
                    "tiers must be sorted by strictly increasing multiplier".into(),
                ));
            }
        }
        for tier in &self.tiers {
            let values = [tier.from_multiplier, tier.base, tier.slope];
            if values.iter().any(|v| !v.is_finite()) || tier.base < 0.0 || tier.slope < 0.0 {
                return Err(ConfigError::InvalidHazard(format!(
                    "tier at {}x has a negative or non-finite rate",
                    tier.from_multiplier
                )));
            }
        }
        if !self.grace_period_secs.is_finite()
            || self.grace_period_secs < 0.0
            || !self.time_penalty.is_finite()
            || self.time_penalty < 0.0
        {
            return Err(ConfigError::InvalidHazard(
                "grace period and time penalty must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Stochastic crash decision.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CrashHazardModel {
    params: HazardParams,
}

impl CrashHazardModel {
    /// Create a model from validated parameters.
    pub fn new(params: HazardParams) -> Self {
        Self { params }
    }

    /// Multiplier-dependent part of the hazard rate.
    pub fn base_hazard(&self, multiplier: f64) -> f64 {
        let tier = self
            .params
            .tiers
            .iter()
            .rev()
            .find(|tier| tier.from_multiplier <= multiplier)
            .or_else(|| self.params.tiers.first());

        match tier {
            Some(tier) => {
                tier.base + tier.slope * (multiplier - tier.from_multiplier).max(0.0)
            }
            None => 0.0,
        }
    }

    /// Instantaneous crash rate λ, per second.
    pub fn hazard_rate(&self, multiplier: f64, elapsed_secs: f64) -> f64 {
        let overtime = (elapsed_secs - self.params.grace_period_secs).max(0.0);
        self.base_hazard(multiplier) + overtime * self.params.time_penalty
    }

    /// Probability of crashing within a tick of `dt_secs`.
    #[inline]
    pub fn tick_probability(&self, multiplier: f64, elapsed_secs: f64, dt_secs: f64) -> f64 {
        let lambda = self.hazard_rate(multiplier, elapsed_secs);
        1.0 - (-lambda * dt_secs.max(0.0)).exp()
    }

    /// Draw once from `rng` and decide whether the round crashes this tick.
    pub fn should_crash(
        &self,
        multiplier: f64,
        elapsed_secs: f64,
        dt_secs: f64,
        rng: &mut dyn RandomSource,
    ) -> bool {
        rng.next_f64() < self.tick_probability(multiplier, elapsed_secs, dt_secs)
    }
}
