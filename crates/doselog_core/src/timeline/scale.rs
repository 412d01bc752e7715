//! Blended logarithmic/linear time axis.
//!
//! # Invariants
//! - `fraction(0, total) == 0` and `fraction(total, total) == 1`.
//! - `fraction` is monotonically non-decreasing in `t` on `[0, total]`.
//! - One chart uses one `AxisScale` for every element it draws.

use serde::{Deserialize, Serialize};

const MIN_EPSILON: f64 = 1e-9;
const MIN_LOG_SPAN: f64 = 1e-12;
const FALLBACK_LOG_BASE: f64 = 10.0;

/// Weights and parameters of the blended transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisScale {
    pub log_weight: f64,
    pub linear_weight: f64,
    pub log_base: f64,
    /// Offset added before taking the log so `t = 0` stays finite.
    pub epsilon: f64,
}

impl Default for AxisScale {
    fn default() -> Self {
        Self::single_experience()
    }
}

impl AxisScale {
    /// Log-heavy weighting for one dose, stretching the short onset.
    pub fn single_experience() -> Self {
        Self {
            log_weight: 0.7,
            linear_weight: 0.3,
            log_base: 10.0,
            epsilon: 0.01,
        }
    }

    /// Mostly linear weighting for the multi-dose composite view.
    pub fn composite() -> Self {
        Self {
            log_weight: 0.2,
            linear_weight: 0.8,
            ..Self::single_experience()
        }
    }

    pub fn linear() -> Self {
        Self {
            log_weight: 0.0,
            linear_weight: 1.0,
            ..Self::single_experience()
        }
    }

    /// Maps `time_hours` on a `[0, total_hours]` axis to a `[0, 1]` fraction.
    ///
    /// Input outside the axis is clamped. A non-positive total maps
    /// everything to `0`.
    pub fn fraction(&self, time_hours: f64, total_hours: f64) -> f64 {
        if !total_hours.is_finite() || total_hours <= 0.0 {
            return 0.0;
        }
        let t = if time_hours.is_nan() {
            0.0
        } else {
            time_hours.clamp(0.0, total_hours)
        };

        let linear = t / total_hours;
        let log_weight = self.log_weight.max(0.0);
        let linear_weight = self.linear_weight.max(0.0);
        let weight_sum = log_weight + linear_weight;
        if !weight_sum.is_finite() || weight_sum <= 0.0 {
            return linear;
        }

        let blended = (log_weight * self.log_fraction(t, total_hours) + linear_weight * linear)
            / weight_sum;
        blended.clamp(0.0, 1.0)
    }

    fn log_fraction(&self, t: f64, total_hours: f64) -> f64 {
        let base = if self.log_base.is_finite() && self.log_base > 1.0 {
            self.log_base
        } else {
            FALLBACK_LOG_BASE
        };
        let epsilon = if self.epsilon.is_finite() {
            self.epsilon.max(MIN_EPSILON)
        } else {
            MIN_EPSILON
        };

        let floor = epsilon.log(base);
        let span = ((total_hours + epsilon).log(base) - floor).max(MIN_LOG_SPAN);
        ((t + epsilon).log(base) - floor) / span
    }
}

#[cfg(test)]
mod tests {
    use super::AxisScale;

    #[test]
    fn endpoints_are_exact() {
        for scale in [
            AxisScale::single_experience(),
            AxisScale::composite(),
            AxisScale::linear(),
        ] {
            for total in [0.5, 6.0, 48.0, 1000.0] {
                assert_eq!(scale.fraction(0.0, total), 0.0);
                assert_eq!(scale.fraction(total, total), 1.0);
            }
        }
    }

    #[test]
    fn fraction_is_monotonic() {
        let scale = AxisScale::single_experience();
        let total = 12.0;
        let mut previous = 0.0;
        for step in 0..=1200 {
            let value = scale.fraction(step as f64 * 0.01, total);
            assert!(value >= previous, "non-monotonic at step {step}");
            previous = value;
        }
    }

    #[test]
    fn log_weight_stretches_early_time() {
        let log_heavy = AxisScale::single_experience();
        let linear_heavy = AxisScale::composite();
        assert!(log_heavy.fraction(1.0, 12.0) > linear_heavy.fraction(1.0, 12.0));
        assert!(linear_heavy.fraction(1.0, 12.0) > AxisScale::linear().fraction(1.0, 12.0));
    }

    #[test]
    fn degenerate_inputs_do_not_fault() {
        let scale = AxisScale::single_experience();
        assert_eq!(scale.fraction(1.0, 0.0), 0.0);
        assert_eq!(scale.fraction(f64::NAN, 4.0), 0.0);
        assert_eq!(scale.fraction(9.0, 4.0), 1.0);
        let zero_weights = AxisScale {
            log_weight: 0.0,
            linear_weight: 0.0,
            ..AxisScale::single_experience()
        };
        assert_eq!(zero_weights.fraction(2.0, 4.0), 0.5);
    }
}
