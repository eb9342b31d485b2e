//! Composable array transforms and the capability they share.
//!
//! Every primitive implements [`Transform`]: an optional `fit` on data and an
//! `apply` that produces the transformed array. Stateful primitives keep their
//! fitted parameters in a [`FitState`] and fit lazily the first time they are
//! applied; stateless ones leave `fit` as a no-op.
//!
//! This module holds the channel-wise primitives (channel averaging, percent
//! signal change, polynomial detrending). Grid resampling, trial folding and
//! the spectral transform live in their own modules.

use crate::error::{OscillationError, Result};
use crate::helpers::mean;
use crate::iter_maybe_parallel;
use crate::matrix::TimeSeries;
use nalgebra::{DMatrix, DVector, Dyn, SVD};
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;

/// Name under which a transform is recorded in the transformation chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    LabelAverage,
    Psc,
    Detrend,
    TrialAverage,
    CropInterpolate,
    Fft,
}

impl TransformKind {
    /// Human-readable label, as shown to reporting code.
    pub fn label(self) -> &'static str {
        match self {
            TransformKind::LabelAverage => "Label Average",
            TransformKind::Psc => "PSC",
            TransformKind::Detrend => "Detrend",
            TransformKind::TrialAverage => "Trial Average",
            TransformKind::CropInterpolate => "Crop and Interpolate",
            TransformKind::Fft => "FFT",
        }
    }

    /// Transforms that must not be applied twice to the same pipeline.
    pub fn is_idempotence_sensitive(self) -> bool {
        matches!(self, TransformKind::Psc | TransformKind::Detrend)
    }
}

impl std::fmt::Display for TransformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Fit status of a stateful transform.
#[derive(Debug, Clone, Default)]
pub enum FitState<S> {
    #[default]
    Unfit,
    /// Fitting is in progress; a failed fit falls back to `Unfit`.
    Fitting,
    Fitted(S),
}

impl<S> FitState<S> {
    pub fn is_fitted(&self) -> bool {
        matches!(self, FitState::Fitted(_))
    }

    /// Fitted parameters, if any.
    pub fn fitted(&self) -> Option<&S> {
        match self {
            FitState::Fitted(s) => Some(s),
            _ => None,
        }
    }

    /// Run `fit` and store its output, replacing any previous state.
    pub fn fit_with<F>(&mut self, fit: F) -> Result<&S>
    where
        F: FnOnce() -> Result<S>,
    {
        *self = FitState::Fitting;
        match fit() {
            Ok(state) => *self = FitState::Fitted(state),
            Err(e) => {
                *self = FitState::Unfit;
                return Err(e);
            }
        }
        self.fitted().ok_or(OscillationError::InvalidParameter {
            parameter: "fit_state",
            message: "transform did not reach the fitted state".to_string(),
        })
    }

    /// Fitted parameters, fitting first if needed.
    pub fn get_or_fit<F>(&mut self, fit: F) -> Result<&S>
    where
        F: FnOnce() -> Result<S>,
    {
        if !self.is_fitted() {
            return self.fit_with(fit);
        }
        self.fitted().ok_or(OscillationError::InvalidParameter {
            parameter: "fit_state",
            message: "transform did not reach the fitted state".to_string(),
        })
    }
}

/// The fit/apply capability shared by every transform primitive.
pub trait Transform {
    /// Chain label of this transform.
    fn kind(&self) -> TransformKind;

    /// Whether `apply` can run without fitting first. Stateless transforms are always fitted.
    fn is_fitted(&self) -> bool {
        true
    }

    /// Learn parameters from `data`. No-op for stateless transforms.
    fn fit(&mut self, _data: &TimeSeries) -> Result<()> {
        Ok(())
    }

    /// Transform `data`, fitting on it first if the transform is still unfit.
    fn apply(&mut self, data: &TimeSeries) -> Result<TimeSeries>;
}

fn check_not_empty(data: &TimeSeries) -> Result<()> {
    if data.nrows() == 0 || data.ncols() == 0 {
        return Err(OscillationError::EmptyData);
    }
    Ok(())
}

// ============================================================================
// Averager
// ============================================================================

/// Reduces channels by their arithmetic mean, optionally per label group.
#[derive(Debug, Clone, Default)]
pub struct Averager {
    groups: Option<Vec<(String, Vec<usize>)>>,
}

impl Averager {
    /// Collapse all channels into one.
    pub fn new() -> Self {
        Self { groups: None }
    }

    /// One output column per distinct label, in order of first appearance.
    pub fn by_labels(labels: &[String]) -> Self {
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for (j, label) in labels.iter().enumerate() {
            match groups.iter_mut().find(|(id, _)| id == label) {
                Some((_, idx)) => idx.push(j),
                None => groups.push((label.clone(), vec![j])),
            }
        }
        Self {
            groups: Some(groups),
        }
    }

    /// Identifiers of the output columns; a single empty id when ungrouped.
    pub fn ids(&self) -> Vec<String> {
        match &self.groups {
            Some(groups) => groups.iter().map(|(id, _)| id.clone()).collect(),
            None => vec![String::new()],
        }
    }
}

impl Transform for Averager {
    fn kind(&self) -> TransformKind {
        TransformKind::LabelAverage
    }

    fn apply(&mut self, data: &TimeSeries) -> Result<TimeSeries> {
        check_not_empty(data)?;
        let Some(groups) = &self.groups else {
            return Ok(TimeSeries::from_channel(data.row_means()));
        };
        let labelled: usize = groups.iter().map(|(_, idx)| idx.len()).sum();
        if labelled != data.ncols() {
            return Err(OscillationError::ShapeMismatch {
                expected: labelled,
                actual: data.ncols(),
                context: "Averager::apply (labels vs channels)",
            });
        }
        let columns: Vec<Vec<f64>> = groups
            .iter()
            .map(|(_, idx)| data.select_columns(idx).row_means())
            .collect();
        TimeSeries::from_columns(&columns).ok_or(OscillationError::EmptyData)
    }
}

// ============================================================================
// Percent signal change
// ============================================================================

/// Row range `[begin, end)` covering a baseline window given in seconds.
///
/// Indices are the window bounds divided by `sampling_rate`, truncated, with the
/// end clipped to `n_rows`. An unbounded end, an unusable sampling rate or an
/// empty window falls back to the whole series.
pub fn baseline_window(
    n_rows: usize,
    sampling_rate: f64,
    baseline_begin: f64,
    baseline_end: f64,
) -> (usize, usize) {
    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return (0, n_rows);
    }
    let begin = (baseline_begin / sampling_rate).max(0.0);
    let begin = if begin.is_finite() { begin as usize } else { n_rows };
    let end = baseline_end / sampling_rate;
    let end = if end.is_finite() {
        (end.max(0.0) as usize).min(n_rows)
    } else {
        n_rows
    };
    if begin >= end {
        return (0, n_rows);
    }
    (begin, end)
}

/// Expresses every sample as percent change from a per-channel baseline mean.
#[derive(Debug, Clone, Default)]
pub struct PscNormalizer {
    state: FitState<Vec<f64>>,
}

impl PscNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit on the rows of `data` inside a baseline window given in seconds.
    ///
    /// Channels whose window mean is zero (or undefined) use their
    /// whole-series mean instead.
    pub fn fit_window(
        &mut self,
        data: &TimeSeries,
        sampling_rate: f64,
        baseline_begin: f64,
        baseline_end: f64,
    ) -> Result<()> {
        check_not_empty(data)?;
        let (begin, end) = baseline_window(data.nrows(), sampling_rate, baseline_begin, baseline_end);
        self.state.fit_with(|| {
            let window_means = data.slice_rows(begin, end).column_means();
            let means = window_means
                .into_iter()
                .zip(data.columns())
                .map(|(m, col)| {
                    if m == 0.0 || !m.is_finite() {
                        mean(col)
                    } else {
                        m
                    }
                })
                .collect();
            Ok(means)
        })?;
        Ok(())
    }

    /// Fitted per-channel baseline means.
    pub fn baseline(&self) -> Option<&[f64]> {
        self.state.fitted().map(Vec::as_slice)
    }
}

impl Transform for PscNormalizer {
    fn kind(&self) -> TransformKind {
        TransformKind::Psc
    }

    fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    fn fit(&mut self, data: &TimeSeries) -> Result<()> {
        check_not_empty(data)?;
        self.state.fit_with(|| Ok(data.column_means()))?;
        Ok(())
    }

    fn apply(&mut self, data: &TimeSeries) -> Result<TimeSeries> {
        check_not_empty(data)?;
        let baseline = self.state.get_or_fit(|| Ok(data.column_means()))?;
        if baseline.len() != data.ncols() {
            return Err(OscillationError::ShapeMismatch {
                expected: baseline.len(),
                actual: data.ncols(),
                context: "PscNormalizer::apply",
            });
        }
        let mut out = data.clone();
        for (j, &b) in baseline.iter().enumerate() {
            for v in out.column_mut(j) {
                *v = 100.0 * (*v - b) / b;
            }
        }
        Ok(out)
    }
}

// ============================================================================
// Polynomial detrending
// ============================================================================

/// Least-squares polynomial basis over sample indices.
#[derive(Debug, Clone)]
pub struct PolynomialBasis {
    nrows: usize,
    design: DMatrix<f64>,
    svd: SVD<f64, Dyn, Dyn>,
}

fn build_vandermonde_matrix(t_norm: &[f64], n_coef: usize) -> DMatrix<f64> {
    let m = t_norm.len();
    let mut design = DMatrix::zeros(m, n_coef);
    for j in 0..m {
        let t = t_norm[j];
        let mut power = 1.0;
        for k in 0..n_coef {
            design[(j, k)] = power;
            power *= t;
        }
    }
    design
}

impl PolynomialBasis {
    /// Basis of the given order on `nrows` samples.
    ///
    /// Sample indices are scaled to `[0, 1]` to keep the Vandermonde matrix
    /// well conditioned. Short series get the highest order they support.
    pub fn new(nrows: usize, order: usize) -> Self {
        let n_coef = (order + 1).min(nrows.max(1));
        let denom = if nrows > 1 { (nrows - 1) as f64 } else { 1.0 };
        let t_norm: Vec<f64> = (0..nrows).map(|i| i as f64 / denom).collect();
        let design = build_vandermonde_matrix(&t_norm, n_coef);
        let svd = design.clone().svd(true, true);
        Self { nrows, design, svd }
    }

    /// Fitted trend for one channel.
    pub fn trend(&self, curve: &[f64]) -> Vec<f64> {
        let y = DVector::from_column_slice(curve);
        let beta = self
            .svd
            .solve(&y, 1e-10)
            .unwrap_or_else(|_| DVector::zeros(self.design.ncols()));
        let fitted = &self.design * beta;
        fitted.iter().copied().collect()
    }
}

/// Removes a polynomial trend from each channel.
#[derive(Debug, Clone)]
pub struct Detrender {
    order: usize,
    keep_mean: bool,
    state: FitState<PolynomialBasis>,
}

impl Default for Detrender {
    fn default() -> Self {
        Self::new(3, true)
    }
}

impl Detrender {
    /// `keep_mean` re-adds each channel's mean so only the trend is removed.
    pub fn new(order: usize, keep_mean: bool) -> Self {
        Self {
            order,
            keep_mean,
            state: FitState::Unfit,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }
}

impl Transform for Detrender {
    fn kind(&self) -> TransformKind {
        TransformKind::Detrend
    }

    fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    fn fit(&mut self, data: &TimeSeries) -> Result<()> {
        check_not_empty(data)?;
        let order = self.order;
        self.state
            .fit_with(|| Ok(PolynomialBasis::new(data.nrows(), order)))?;
        Ok(())
    }

    fn apply(&mut self, data: &TimeSeries) -> Result<TimeSeries> {
        check_not_empty(data)?;
        let order = self.order;
        let keep_mean = self.keep_mean;
        let basis = self
            .state
            .get_or_fit(|| Ok(PolynomialBasis::new(data.nrows(), order)))?;
        if basis.nrows != data.nrows() {
            return Err(OscillationError::ShapeMismatch {
                expected: basis.nrows,
                actual: data.nrows(),
                context: "Detrender::apply",
            });
        }
        let columns: Vec<Vec<f64>> = iter_maybe_parallel!(0..data.ncols())
            .map(|j| {
                let curve = data.column(j);
                let trend = basis.trend(curve);
                let offset = if keep_mean { mean(curve) } else { 0.0 };
                curve
                    .iter()
                    .zip(&trend)
                    .map(|(&y, &t)| y - t + offset)
                    .collect()
            })
            .collect();
        TimeSeries::from_columns(&columns).ok_or(OscillationError::EmptyData)
    }
}
