//! Monotone cubic interpolation onto a stimulus-aligned periodic grid.
//!
//! [`PeriodicGridResampler`] crops the transient head of a recording and
//! resamples it onto a fine grid holding a whole number of stimulus cycles,
//! which is what [`TrialFolder`](crate::folding::TrialFolder) expects.

use crate::error::{OscillationError, Result};
use crate::grid::{periodic_grid, samples_per_cycle, trial_count};
use crate::helpers::uniform_grid;
use crate::matrix::TimeSeries;
use crate::transform::{FitState, Transform, TransformKind};
use tracing::warn;

/// Piecewise cubic Hermite interpolant with Fritsch-Carlson slopes.
///
/// Preserves monotonicity of the data between knots, so it never overshoots
/// a step the way a natural cubic spline does.
#[derive(Debug, Clone)]
pub struct Pchip {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl Pchip {
    /// Build from strictly increasing `x` and matching `y` (at least two knots).
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(OscillationError::ShapeMismatch {
                expected: x.len(),
                actual: y.len(),
                context: "Pchip::new",
            });
        }
        if x.len() < 2 {
            return Err(OscillationError::InsufficientData {
                required: 2,
                actual: x.len(),
                context: "Pchip::new",
            });
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(OscillationError::InvalidParameter {
                parameter: "x",
                message: "knots must be strictly increasing".to_string(),
            });
        }
        Ok(Self {
            slopes: compute_slopes(x, y),
            x: x.to_vec(),
            y: y.to_vec(),
        })
    }

    /// Evaluate at `xi`; points outside the knot range extrapolate the end cubic.
    pub fn eval(&self, xi: f64) -> f64 {
        let i = find_interval(&self.x, xi);
        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let h = x1 - x0;
        let t = (xi - x0) / h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        h00 * self.y[i] + h10 * h * self.slopes[i] + h01 * self.y[i + 1] + h11 * h * self.slopes[i + 1]
    }

    pub fn eval_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }
}

/// Index `i` with `x[i] <= xi < x[i + 1]`, clamped to the first/last interval.
fn find_interval(x: &[f64], xi: f64) -> usize {
    let n = x.len();
    let mut lo = 0;
    let mut hi = n - 1;
    while lo + 1 < hi {
        let mid = (lo + hi) / 2;
        if x[mid] <= xi {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

fn compute_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut slopes = vec![0.0; n];

    if n == 2 {
        let secant = (y[1] - y[0]) / (x[1] - x[0]);
        slopes[0] = secant;
        slopes[1] = secant;
        return slopes;
    }

    let secants: Vec<f64> = (0..n - 1)
        .map(|i| (y[i + 1] - y[i]) / (x[i + 1] - x[i]))
        .collect();

    for i in 1..n - 1 {
        let s0 = secants[i - 1];
        let s1 = secants[i];
        if s0 * s1 <= 0.0 {
            slopes[i] = 0.0;
        } else {
            let h0 = x[i] - x[i - 1];
            let h1 = x[i + 1] - x[i];
            let w1 = 2.0 * h1 + h0;
            let w2 = h1 + 2.0 * h0;
            slopes[i] = (w1 + w2) / (w1 / s0 + w2 / s1);
        }
    }

    slopes[0] = endpoint_slope(secants[0], secants[1], x[1] - x[0], x[2] - x[1]);
    slopes[n - 1] = endpoint_slope(
        secants[n - 2],
        secants[n - 3],
        x[n - 1] - x[n - 2],
        x[n - 2] - x[n - 3],
    );
    slopes
}

/// One-sided three-point endpoint slope, limited to keep the shape.
fn endpoint_slope(s1: f64, s2: f64, h1: f64, h2: f64) -> f64 {
    let d = ((2.0 * h1 + h2) * s1 - h1 * s2) / (h1 + h2);
    if d.signum() != s1.signum() {
        0.0
    } else if s1.signum() != s2.signum() && d.abs() > 3.0 * s1.abs() {
        3.0 * s1
    } else {
        d
    }
}

/// Crops to whole steady-state cycles and resamples onto a fine periodic grid.
#[derive(Debug, Clone)]
pub struct PeriodicGridResampler {
    period: f64,
    sampling_in: f64,
    target_sampling_out: f64,
    start_offset: f64,
    state: FitState<Vec<f64>>,
}

impl PeriodicGridResampler {
    /// `sampling_in` is the spacing of the input rows, `target_sampling_out` the
    /// spacing of the output grid, `start_offset` the first output time (seconds).
    pub fn new(
        period: f64,
        sampling_in: f64,
        target_sampling_out: f64,
        start_offset: f64,
    ) -> Result<Self> {
        for (parameter, value) in [
            ("period", period),
            ("sampling_in", sampling_in),
            ("target_sampling_out", target_sampling_out),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(OscillationError::InvalidTiming { parameter, value });
            }
        }
        if !start_offset.is_finite() {
            return Err(OscillationError::InvalidTiming {
                parameter: "start_offset",
                value: start_offset,
            });
        }
        Ok(Self {
            period,
            sampling_in,
            target_sampling_out,
            start_offset,
            state: FitState::Unfit,
        })
    }

    /// Absolute times (seconds from recording start) of the output rows, once fitted.
    pub fn target_grid(&self) -> Option<&[f64]> {
        self.state.fitted().map(Vec::as_slice)
    }

    fn build_grid(&self, n_rows: usize) -> Result<Vec<f64>> {
        let n_trials = trial_count(self.start_offset, self.period, self.sampling_in, n_rows);
        if n_trials == 0 {
            return Err(OscillationError::InsufficientTrials { n_trials });
        }
        let exact = self.period / self.target_sampling_out;
        if (exact - exact.round()).abs() > 1e-6 {
            warn!(
                period = self.period,
                target_sampling_out = self.target_sampling_out,
                samples_per_cycle = samples_per_cycle(self.period, self.target_sampling_out),
                "period is not a whole multiple of the output sampling; cycles will drift"
            );
        }
        Ok(periodic_grid(
            self.start_offset,
            self.period,
            n_trials,
            self.target_sampling_out,
        ))
    }
}

impl Transform for PeriodicGridResampler {
    fn kind(&self) -> TransformKind {
        TransformKind::CropInterpolate
    }

    fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    fn fit(&mut self, data: &TimeSeries) -> Result<()> {
        let grid = self.build_grid(data.nrows())?;
        self.state.fit_with(|| Ok(grid))?;
        Ok(())
    }

    fn apply(&mut self, data: &TimeSeries) -> Result<TimeSeries> {
        if data.ncols() == 0 {
            return Err(OscillationError::EmptyData);
        }
        if !self.is_fitted() {
            self.fit(data)?;
        }
        let target = self.target_grid().ok_or(OscillationError::EmptyData)?;
        let source = uniform_grid(0.0, self.sampling_in, data.nrows());
        let columns = data
            .columns()
            .map(|col| Pchip::new(&source, col).map(|p| p.eval_many(target)))
            .collect::<Result<Vec<_>>>()?;
        TimeSeries::from_columns(&columns).ok_or(OscillationError::EmptyData)
    }
}
