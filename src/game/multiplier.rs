//! Multiplier Growth
//!
//! Pure mapping from flight time to payout multiplier. No hidden state:
//! the same elapsed time always yields the same multiplier, which is what
//! lets the tick loop recompute from `now - start` instead of integrating.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Growth curve selection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GrowthMode {
    /// `m(t) = e^(rate * t)`
    Exponential {
        /// Per-second growth rate.
        rate: f64,
    },
    /// `m(t) = 1 + a*t + b*t^2`
    Polynomial {
        /// Linear coefficient `a`.
        base_growth: f64,
        /// Quadratic coefficient `b`.
        acceleration: f64,
    },
}

impl Default for GrowthMode {
    fn default() -> Self {
        // ~2x at 1.26s
        GrowthMode::Exponential { rate: 0.55 }
    }
}

impl GrowthMode {
    /// Check that the curve starts at 1.0 and never decreases.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            GrowthMode::Exponential { rate } => {
                if !rate.is_finite() || rate <= 0.0 {
                    return Err(ConfigError::InvalidGrowth(format!(
                        "exponential rate must be positive, got {rate}"
                    )));
                }
            }
            GrowthMode::Polynomial { base_growth, acceleration } => {
                if !base_growth.is_finite() || !acceleration.is_finite() {
                    return Err(ConfigError::InvalidGrowth(
                        "polynomial coefficients must be finite".into(),
                    ));
                }
                if base_growth < 0.0 || acceleration < 0.0 {
                    return Err(ConfigError::InvalidGrowth(
                        "polynomial coefficients must be non-negative".into(),
                    ));
                }
                if base_growth == 0.0 && acceleration == 0.0 {
                    return Err(ConfigError::InvalidGrowth(
                        "polynomial curve never leaves 1.0x".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Multiplier as a function of elapsed flight seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MultiplierModel {
    mode: GrowthMode,
}

impl MultiplierModel {
    /// Create a model for the given curve.
    pub fn new(mode: GrowthMode) -> Self {
        Self { mode }
    }

    /// Multiplier after `elapsed_secs` of flight.
    ///
    /// Exactly `1.0` at `t = 0`; negative times clamp to zero.
    #[inline]
    pub fn at(&self, elapsed_secs: f64) -> f64 {
        let t = elapsed_secs.max(0.0);
        let m = match self.mode {
            GrowthMode::Exponential { rate } => (rate * t).exp(),
            GrowthMode::Polynomial { base_growth, acceleration } => {
                1.0 + base_growth * t + acceleration * t * t
            }
        };
        m.max(1.0)
    }

    /// Earliest flight time at which the multiplier reaches `target`.
    ///
    /// `None` if the curve never gets there.
    pub fn time_to_reach(&self, target: f64) -> Option<f64> {
        if target <= 1.0 {
            return Some(0.0);
        }
        match self.mode {
            GrowthMode::Exponential { rate } => Some(target.ln() / rate),
            GrowthMode::Polynomial { base_growth: a, acceleration: b } => {
                let c = 1.0 - target;
                if b == 0.0 {
                    return (a > 0.0).then(|| -c / a);
                }
                // Positive root of b*t^2 + a*t + c = 0 (c < 0, so it exists)
                Some((-a + (a * a - 4.0 * b * c).sqrt()) / (2.0 * b))
            }
        }
    }
}

impl Default for MultiplierModel {
    fn default() -> Self {
        Self::new(GrowthMode::default())
    }
}
