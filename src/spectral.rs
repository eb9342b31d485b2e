//! Frequency-domain view of the current signal.
//!
//! [`SpectralTransform`] replaces every channel by its one-sided amplitude
//! spectrum. Output row `k` sits at `k / (N * sampling_rate)` Hz for
//! `k = 0..=N/2`, so the grid spacing downstream is `1 / (N * sampling_rate)`.

use crate::error::{OscillationError, Result};
use crate::matrix::TimeSeries;
use crate::transform::{FitState, Transform, TransformKind};
use num_complex::Complex;
use rustfft::FftPlanner;

/// Frequencies (Hz) of the one-sided spectrum of `n` samples spaced `dt` apart.
pub fn rfft_frequencies(n: usize, dt: f64) -> Vec<f64> {
    let n_freq = n / 2 + 1;
    (0..n_freq).map(|k| k as f64 / (n as f64 * dt)).collect()
}

/// One-sided amplitude spectrum of a real series.
///
/// Bins are `|X_k| / N`, with every bin except DC and Nyquist doubled, so a
/// sinusoid of amplitude `a` on an exact bin shows up with height `a`.
pub fn amplitude_spectrum(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut buffer: Vec<Complex<f64>> = values.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft.process(&mut buffer);

    let n_freq = n / 2 + 1;
    buffer
        .iter()
        .take(n_freq)
        .enumerate()
        .map(|(k, c)| {
            let a = c.norm() / n as f64;
            if k > 0 && 2 * k != n {
                2.0 * a
            } else {
                a
            }
        })
        .collect()
}

/// Replaces each channel by its amplitude spectrum.
#[derive(Debug, Clone)]
pub struct SpectralTransform {
    sampling_rate: f64,
    state: FitState<Vec<f64>>,
}

impl SpectralTransform {
    /// `sampling_rate` is the spacing, in seconds, of the rows being transformed.
    pub fn new(sampling_rate: f64) -> Result<Self> {
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(OscillationError::InvalidTiming {
                parameter: "sampling_rate",
                value: sampling_rate,
            });
        }
        Ok(Self {
            sampling_rate,
            state: FitState::Unfit,
        })
    }

    /// Bin frequencies in Hz, once fitted.
    pub fn frequencies(&self) -> Option<&[f64]> {
        self.state.fitted().map(Vec::as_slice)
    }
}

impl Transform for SpectralTransform {
    fn kind(&self) -> TransformKind {
        TransformKind::Fft
    }

    fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    fn fit(&mut self, data: &TimeSeries) -> Result<()> {
        if data.nrows() == 0 {
            return Err(OscillationError::EmptyData);
        }
        let dt = self.sampling_rate;
        self.state
            .fit_with(|| Ok(rfft_frequencies(data.nrows(), dt)))?;
        Ok(())
    }

    fn apply(&mut self, data: &TimeSeries) -> Result<TimeSeries> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(OscillationError::EmptyData);
        }
        let dt = self.sampling_rate;
        let freqs = self
            .state
            .get_or_fit(|| Ok(rfft_frequencies(data.nrows(), dt)))?;
        if freqs.len() != data.nrows() / 2 + 1 {
            return Err(OscillationError::ShapeMismatch {
                expected: freqs.len(),
                actual: data.nrows() / 2 + 1,
                context: "SpectralTransform::apply (fitted frequency bins)",
            });
        }
        let columns: Vec<Vec<f64>> = data.columns().map(amplitude_spectrum).collect();
        TimeSeries::from_columns(&columns).ok_or(OscillationError::EmptyData)
    }
}
