//! Trial folding: averaging a cycle-aligned signal across stimulus repetitions.
//!
//! The input is reshaped into `n_trials` consecutive cycles of equal length
//! and reduced by the mean at each within-cycle phase. Optionally, trials are
//! bootstrapped (resampled with replacement) to obtain percentile confidence
//! bounds for that mean.
//!
//! Every bootstrap iteration owns an RNG seeded from the base seed and its
//! iteration index, and the percentiles are taken over the complete
//! collection of resampled means, so the bounds are the same whether the
//! iterations run sequentially or in parallel.

use crate::config::BootstrapConfig;
use crate::error::{OscillationError, Result};
use crate::helpers::percentile_sorted;
use crate::iter_maybe_parallel;
use crate::matrix::TimeSeries;
use crate::transform::{Transform, TransformKind};
use rand::prelude::*;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use tracing::debug;

/// Averages `n_trials` equal-length cycles into one, with optional bootstrap bounds.
#[derive(Debug, Clone)]
pub struct TrialFolder {
    n_trials: usize,
    bootstrap: Option<BootstrapConfig>,
    ci_low: Option<TimeSeries>,
    ci_high: Option<TimeSeries>,
}

impl TrialFolder {
    /// Bootstrap, when requested, uses the default [`BootstrapConfig`].
    pub fn new(n_trials: usize, bootstrap: bool) -> Self {
        Self {
            n_trials,
            bootstrap: bootstrap.then(BootstrapConfig::default),
            ci_low: None,
            ci_high: None,
        }
    }

    /// Always bootstraps, with the given settings.
    pub fn with_bootstrap(n_trials: usize, config: BootstrapConfig) -> Self {
        Self {
            n_trials,
            bootstrap: Some(config),
            ci_low: None,
            ci_high: None,
        }
    }

    pub fn n_trials(&self) -> usize {
        self.n_trials
    }

    /// Lower percentile bound per (phase, channel), after a bootstrapped apply.
    pub fn ci_low(&self) -> Option<&TimeSeries> {
        self.ci_low.as_ref()
    }

    /// Upper percentile bound per (phase, channel), after a bootstrapped apply.
    pub fn ci_high(&self) -> Option<&TimeSeries> {
        self.ci_high.as_ref()
    }

    /// Rows per cycle for an input of `nrows` rows.
    fn cycle_len(&self, nrows: usize) -> Result<usize> {
        if self.n_trials == 0 {
            return Err(OscillationError::InsufficientTrials { n_trials: 0 });
        }
        let len = nrows / self.n_trials;
        if len == 0 {
            return Err(OscillationError::InsufficientData {
                required: self.n_trials,
                actual: nrows,
                context: "TrialFolder (one row per trial at least)",
            });
        }
        Ok(len)
    }
}

/// Mean cycle over the trials listed in `trials` (repeats allowed).
///
/// Output is column-major `cycle_len × ncols`.
fn fold_mean(data: &TimeSeries, cycle_len: usize, trials: &[usize]) -> Vec<f64> {
    let mut out = vec![0.0; cycle_len * data.ncols()];
    let weight = 1.0 / trials.len() as f64;
    for (j, col) in data.columns().enumerate() {
        let dst = &mut out[j * cycle_len..(j + 1) * cycle_len];
        for &t in trials {
            let cycle = &col[t * cycle_len..(t + 1) * cycle_len];
            for (d, &v) in dst.iter_mut().zip(cycle) {
                *d += v;
            }
        }
        for d in dst.iter_mut() {
            *d *= weight;
        }
    }
    out
}

/// Percentile bounds of bootstrapped trial means.
fn bootstrap_bounds(
    data: &TimeSeries,
    cycle_len: usize,
    n_trials: usize,
    config: &BootstrapConfig,
) -> (Vec<f64>, Vec<f64>) {
    let base_seed = config.seed.unwrap_or_else(|| thread_rng().gen());
    debug!(
        base_seed,
        iterations = config.iterations,
        n_trials,
        "bootstrapping trial means"
    );

    let samples: Vec<Vec<f64>> = iter_maybe_parallel!(0..config.iterations)
        .map(|b| {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(b as u64));
            let trials: Vec<usize> = (0..n_trials).map(|_| rng.gen_range(0..n_trials)).collect();
            fold_mean(data, cycle_len, &trials)
        })
        .collect();

    let n_cells = cycle_len * data.ncols();
    let mut low = vec![0.0; n_cells];
    let mut high = vec![0.0; n_cells];
    let mut column = vec![0.0; samples.len()];
    for cell in 0..n_cells {
        for (c, s) in column.iter_mut().zip(&samples) {
            *c = s[cell];
        }
        column.sort_by(|a, b| a.total_cmp(b));
        low[cell] = percentile_sorted(&column, config.ci_low);
        high[cell] = percentile_sorted(&column, config.ci_high);
    }
    (low, high)
}

impl Transform for TrialFolder {
    fn kind(&self) -> TransformKind {
        TransformKind::TrialAverage
    }

    fn apply(&mut self, data: &TimeSeries) -> Result<TimeSeries> {
        if data.ncols() == 0 {
            return Err(OscillationError::EmptyData);
        }
        let cycle_len = self.cycle_len(data.nrows())?;
        let all_trials: Vec<usize> = (0..self.n_trials).collect();
        let mean = fold_mean(data, cycle_len, &all_trials);
        let ncols = data.ncols();

        if let Some(config) = &self.bootstrap {
            let (low, high) = bootstrap_bounds(data, cycle_len, self.n_trials, config);
            self.ci_low = TimeSeries::from_column_major(low, cycle_len, ncols);
            self.ci_high = TimeSeries::from_column_major(high, cycle_len, ncols);
        }

        TimeSeries::from_column_major(mean, cycle_len, ncols).ok_or(OscillationError::EmptyData)
    }
}
