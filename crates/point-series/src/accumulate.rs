//! Reset-trigger accumulation over a compacted value sequence.
//!
//! Both derived snow series share one rule for when an episode ends: a
//! step whose value does not exceed the previous one. They differ in how
//! the running sum is handled around that trigger, selected by
//! [`ResetPolicy`]. Indices are positions in the compacted series, not
//! forecast offsets, so gaps left by skipped steps are invisible here.

use serde::{Deserialize, Serialize};

use crate::units::round_to;

/// How the running sum behaves when an episode ends and a new one starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Storm total. Tracks an `accumulating` flag; the first positive
    /// increment after a reset zeroes the total and is carried into the
    /// new episode.
    CarryIncrement,
    /// Hourly rate. The trigger step emits 0 and discards its increment;
    /// the sum only grows while consecutive increases continue.
    DiscardOnTrigger,
}

/// Running total owned by one accumulation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct AccumulationState {
    total: f64,
    accumulating: bool,
}

impl AccumulationState {
    fn reset(&mut self) {
        self.total = 0.0;
        self.accumulating = false;
    }
}

/// Single-pass accumulator parameterized by its reset policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetAccumulator {
    pub policy: ResetPolicy,
    /// Decimal places of emitted values; `None` leaves them unrounded.
    pub decimals: Option<u32>,
}

impl ResetAccumulator {
    pub fn new(policy: ResetPolicy) -> Self {
        Self {
            policy,
            decimals: None,
        }
    }

    pub fn with_rounding(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    /// Running positive accumulation in inches, rounded to 3 decimals.
    pub fn storm_total() -> Self {
        Self::new(ResetPolicy::CarryIncrement).with_rounding(3)
    }

    /// Incremental snowfall rate series, rounded to 3 decimals.
    pub fn hourly_rate() -> Self {
        Self::new(ResetPolicy::DiscardOnTrigger).with_rounding(3)
    }

    /// Compute the derived series. Output has the same length as `values`.
    pub fn run(&self, values: &[f64]) -> Vec<f64> {
        let mut state = AccumulationState::default();
        let mut out = Vec::with_capacity(values.len());

        for (i, &value) in values.iter().enumerate() {
            let emitted = if i == 0 {
                // First sample is a baseline.
                state.reset();
                0.0
            } else {
                let previous = values[i - 1];
                match self.policy {
                    ResetPolicy::CarryIncrement => {
                        let inc = (value - previous).max(0.0);
                        if inc > 0.0 {
                            if !state.accumulating {
                                state.total = 0.0;
                                state.accumulating = true;
                            }
                            state.total += inc;
                        } else {
                            state.reset();
                        }
                        state.total
                    }
                    ResetPolicy::DiscardOnTrigger => {
                        if value <= previous {
                            state.total = 0.0;
                            0.0
                        } else {
                            state.total += (value - previous).max(0.0);
                            state.total
                        }
                    }
                }
            };

            out.push(match self.decimals {
                Some(d) => round_to(emitted, d),
                None => emitted,
            });
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storm_total_resets_on_flat_and_decline() {
        let depths = [10.0, 10.0, 12.0, 11.0, 13.0, 14.0];
        assert_eq!(
            ResetAccumulator::storm_total().run(&depths),
            vec![0.0, 0.0, 2.0, 0.0, 2.0, 3.0]
        );
    }

    #[test]
    fn test_storm_total_first_index_is_baseline() {
        assert_eq!(ResetAccumulator::storm_total().run(&[5.0]), vec![0.0]);
        assert!(ResetAccumulator::storm_total().run(&[]).is_empty());
    }

    #[test]
    fn test_storm_total_rounds_to_three_places() {
        let out = ResetAccumulator::storm_total().run(&[0.0, 0.12345, 0.2]);
        assert_eq!(out, vec![0.0, 0.123, 0.2]);
    }

    #[test]
    fn test_hourly_rate_grows_through_increases() {
        let depths = [1.0, 2.0, 3.5, 3.5, 4.0, 3.0];
        assert_eq!(
            ResetAccumulator::hourly_rate().run(&depths),
            vec![0.0, 1.0, 2.5, 0.0, 0.5, 0.0]
        );
    }

    #[test]
    fn test_hourly_rate_zero_on_every_non_increase() {
        let depths = [3.0, 2.0, 2.0, 1.0];
        let out = ResetAccumulator::hourly_rate().run(&depths);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_unrounded_policy() {
        let out = ResetAccumulator::new(ResetPolicy::DiscardOnTrigger).run(&[0.0, 0.1, 0.3]);
        assert!((out[2] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic() {
        let depths = [0.0, 1.2, 0.4, 0.9, 2.0, 2.0, 2.1];
        let acc = ResetAccumulator::storm_total();
        assert_eq!(acc.run(&depths), acc.run(&depths));
    }
}
