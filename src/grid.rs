//! Stimulus-aligned timing: steady-state offset, trial count and the periodic grid.

use crate::error::{OscillationError, Result};
use crate::helpers::uniform_grid;

/// Seconds of continuous stimulation treated as non-steady-state.
pub const DEFAULT_TRANSIENT_SECONDS: f64 = 40.0;

/// Tolerance admitting an offset landing exactly on the transient boundary.
const BOUNDARY_TOL: f64 = 1e-3;

/// Slack for `(duration - offset) / period` landing a hair below an integer.
const TRIAL_TOL: f64 = 1e-9;

fn check_period(period: f64) -> Result<f64> {
    if period.is_finite() && period > 0.0 {
        Ok(period)
    } else {
        Err(OscillationError::InvalidTiming {
            parameter: "period",
            value: period,
        })
    }
}

/// Start of the steady-state response, in seconds.
///
/// With `discard_transients`, a known `period` and a stimulus starting within
/// the first 40 s, whole periods are added to `stimulus_offset` until the
/// result passes `stimulus_offset + 40` (reaching it exactly counts as passing).
/// Otherwise `stimulus_offset` is returned unchanged.
///
/// ```
/// use fluctus_core::grid::steady_state_offset;
///
/// assert_eq!(steady_state_offset(14.0, Some(10.0), true).unwrap(), 54.0);
/// assert_eq!(steady_state_offset(14.0, Some(10.0), false).unwrap(), 14.0);
/// assert_eq!(steady_state_offset(14.0, None, true).unwrap(), 14.0);
/// ```
pub fn steady_state_offset(
    stimulus_offset: f64,
    period: Option<f64>,
    discard_transients: bool,
) -> Result<f64> {
    steady_state_offset_with(
        stimulus_offset,
        period,
        discard_transients,
        DEFAULT_TRANSIENT_SECONDS,
    )
}

/// [`steady_state_offset`] with a configurable transient duration.
pub fn steady_state_offset_with(
    stimulus_offset: f64,
    period: Option<f64>,
    discard_transients: bool,
    transient_duration: f64,
) -> Result<f64> {
    if !stimulus_offset.is_finite() {
        return Err(OscillationError::InvalidTiming {
            parameter: "stimulus_offset",
            value: stimulus_offset,
        });
    }
    let Some(period) = period else {
        return Ok(stimulus_offset);
    };
    let period = check_period(period)?;
    if !discard_transients || stimulus_offset >= transient_duration {
        return Ok(stimulus_offset);
    }
    let boundary = stimulus_offset + transient_duration - BOUNDARY_TOL;
    let mut offset = stimulus_offset;
    while offset <= boundary {
        offset += period;
    }
    Ok(offset)
}

/// Number of complete stimulus cycles between `offset` and the last sample.
///
/// The recording spans `(n_samples - 1) * tr` seconds. The quotient is
/// truncated toward zero, and anything negative or undefined counts as zero
/// trials.
pub fn trial_count(offset: f64, period: f64, tr: f64, n_samples: usize) -> usize {
    if n_samples == 0 || period.is_nan() || period <= 0.0 {
        return 0;
    }
    let total = (n_samples - 1) as f64 * tr;
    let trials = (total - offset) / period;
    if !trials.is_finite() || trials < 0.0 {
        return 0;
    }
    (trials + TRIAL_TOL).trunc() as usize
}

/// Samples in one cycle on a grid of spacing `dt`.
pub fn samples_per_cycle(period: f64, dt: f64) -> usize {
    ((period / dt).round() as usize).max(1)
}

/// Grid of `n_trials` whole cycles starting at `offset`, spaced `dt` apart.
///
/// Its length is always an exact multiple of [`samples_per_cycle`], so trial
/// folding can reshape it without remainder.
pub fn periodic_grid(offset: f64, period: f64, n_trials: usize, dt: f64) -> Vec<f64> {
    let n = n_trials * samples_per_cycle(period, dt);
    uniform_grid(offset, dt, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_lands_on_boundary() {
        // 14 -> 24 -> 34 -> 44 -> 54; 54 == 14 + 40 is accepted
        let o = steady_state_offset(14.0, Some(10.0), true).unwrap();
        assert!((o - 54.0).abs() < 1e-12);
    }

    #[test]
    fn test_offset_overshoots_boundary() {
        let o = steady_state_offset(14.0, Some(12.0), true).unwrap();
        // 14 + 4 * 12 = 62 is the first value past 54
        assert!((o - 62.0).abs() < 1e-12);
    }

    #[test]
    fn test_offset_late_stimulus_unchanged() {
        assert_eq!(steady_state_offset(45.0, Some(10.0), true).unwrap(), 45.0);
    }

    #[test]
    fn test_offset_custom_transient() {
        let o = steady_state_offset_with(0.0, Some(5.0), true, 12.0).unwrap();
        assert!((o - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_offset_rejects_bad_period() {
        assert!(matches!(
            steady_state_offset(14.0, Some(0.0), true),
            Err(OscillationError::InvalidTiming { parameter: "period", .. })
        ));
        assert!(steady_state_offset(14.0, Some(-3.0), false).is_err());
    }

    #[test]
    fn test_trial_count_scenario_zero() {
        // 600 samples at 0.1 s span 59.9 s, far short of 54 s + one 10 s cycle
        assert_eq!(trial_count(54.0, 10.0, 0.1, 600), 0);
    }

    #[test]
    fn test_trial_count_truncates() {
        // 3000 samples at 0.1 s span 299.9 s; (299.9 - 54) / 10 = 24.59
        assert_eq!(trial_count(54.0, 10.0, 0.1, 3000), 24);
        assert_eq!(trial_count(0.0, 10.0, 1.0, 41), 4);
    }

    #[test]
    fn test_trial_count_negative_is_zero() {
        assert_eq!(trial_count(100.0, 10.0, 0.1, 50), 0);
        assert_eq!(trial_count(0.0, 10.0, 0.1, 0), 0);
    }

    #[test]
    fn test_periodic_grid_whole_cycles() {
        let g = periodic_grid(54.0, 10.0, 3, 0.1);
        assert_eq!(g.len(), 300);
        assert!((g[0] - 54.0).abs() < 1e-12);
        assert!((g[299] - 83.9).abs() < 1e-9);
        assert_eq!(samples_per_cycle(10.0, 0.1), 100);
    }
}
