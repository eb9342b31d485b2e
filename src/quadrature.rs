//! Quadrature demodulation at the stimulus frequency.
//!
//! Each channel is multiplied by a sine and a cosine reference at the target
//! frequency. The products are low-passed (zero phase, cutoff at half the
//! target frequency), smoothed by a moving average and trimmed at both ends,
//! giving a sine trace and a cosine trace. Phase, amplitude and Regan's
//! confidence index are read off those two traces.
//!
//! This path runs on the raw signal and is independent of the transform chain.

use crate::config::QuadratureConfig;
use crate::error::{OscillationError, Result};
use crate::filter::{butterworth_lowpass, sosfiltfilt, Biquad};
use crate::helpers::mean;
use crate::iter_maybe_parallel;
use crate::matrix::TimeSeries;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use std::f64::consts::PI;

/// Moving average of `window` samples, `len - window + 1` outputs.
///
/// Empty when `window` is zero or longer than the input.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || window > values.len() {
        return Vec::new();
    }
    let mut cumsum = Vec::with_capacity(values.len() + 1);
    cumsum.push(0.0);
    let mut acc = 0.0;
    for &v in values {
        acc += v;
        cumsum.push(acc);
    }
    let w = window as f64;
    (window..=values.len())
        .map(|i| (cumsum[i] - cumsum[i - window]) / w)
        .collect()
}

/// `|P + N| / |P - N|`, with `P` the sum of positive and `N` the sum of negative samples.
///
/// 1 for a trace that never changes sign, 0 for one whose lobes cancel.
pub fn ratio(trace: &[f64]) -> f64 {
    let (plus, minus) = trace.iter().fold((0.0, 0.0), |(p, m), &v| {
        if v > 0.0 {
            (p + v, m)
        } else {
            (p, m + v)
        }
    });
    ((plus + minus) / (plus - minus)).abs()
}

/// Regan's confidence index: the two trace ratios weighted by squared trace sums.
pub fn confidence_index(trace_s: &[f64], trace_c: &[f64]) -> f64 {
    let a: f64 = trace_s.iter().sum();
    let b: f64 = trace_c.iter().sum();
    let amp_sq = a.hypot(b).powi(2);
    (a * a * ratio(trace_s) + b * b * ratio(trace_c)) / amp_sq
}

/// Phase (radians) of the response relative to the references.
pub fn phase_estimate(trace_s: &[f64], trace_c: &[f64]) -> f64 {
    mean(trace_s).atan2(mean(trace_c))
}

pub fn amplitude_estimate(trace_s: &[f64], trace_c: &[f64]) -> f64 {
    mean(trace_s).hypot(mean(trace_c)) / 2.0
}

/// Delay in seconds for a phase estimate, accounting for a stimulus that
/// starts at zero and increases.
pub fn phase_to_delay(phase: f64, frequency: f64) -> f64 {
    (phase + PI).to_degrees() * (1.0 / frequency) / 360.0
}

/// Per-channel result of quadrature demodulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadratureEstimate {
    /// Radians, in `(-pi, pi]`.
    pub phase: f64,
    /// Seconds.
    pub delay: f64,
    pub amplitude: f64,
    pub confidence: f64,
}

/// Sine/cosine demodulator for one target frequency.
#[derive(Debug, Clone)]
pub struct QuadratureDemodulator {
    frequency: f64,
    tr: f64,
    offset: f64,
    window: usize,
    sos: Vec<Biquad>,
}

impl QuadratureDemodulator {
    /// `offset` is the time (seconds) the stimulus starts; the references are
    /// phase-aligned to it, shifted by half a sample for slice timing.
    pub fn new(frequency: f64, tr: f64, offset: f64, config: &QuadratureConfig) -> Result<Self> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(OscillationError::InvalidTiming {
                parameter: "frequency",
                value: frequency,
            });
        }
        if !(tr.is_finite() && tr > 0.0) {
            return Err(OscillationError::InvalidTiming {
                parameter: "tr",
                value: tr,
            });
        }
        if config.window == 0 {
            return Err(OscillationError::InvalidParameter {
                parameter: "window",
                message: "must be at least 1 sample".to_string(),
            });
        }
        let sos = butterworth_lowpass(config.filter_order, frequency / 2.0, 1.0 / tr)?;
        Ok(Self {
            frequency,
            tr,
            offset,
            window: config.window,
            sos,
        })
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Sine and cosine traces of one channel.
    pub fn traces(&self, signal: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        let w = self.window;
        if signal.len() < 3 * w {
            return Err(OscillationError::InsufficientData {
                required: 3 * w,
                actual: signal.len(),
                context: "QuadratureDemodulator::traces (three windows)",
            });
        }
        let omega = 2.0 * PI * self.frequency;
        let (prod_s, prod_c): (Vec<f64>, Vec<f64>) = signal
            .iter()
            .enumerate()
            .map(|(k, &x)| {
                let t = k as f64 * self.tr - self.offset + self.tr / 2.0;
                let arg = omega * t;
                (x * arg.sin(), x * arg.cos())
            })
            .unzip();
        let low_s = sosfiltfilt(&self.sos, &prod_s)?;
        let low_c = sosfiltfilt(&self.sos, &prod_c)?;

        let trim = |smoothed: Vec<f64>| smoothed[w..smoothed.len() - w].to_vec();
        Ok((
            trim(moving_average(&low_s, w)),
            trim(moving_average(&low_c, w)),
        ))
    }

    /// Phase, delay, amplitude and confidence of one channel.
    pub fn demodulate(&self, signal: &[f64]) -> Result<QuadratureEstimate> {
        let (trace_s, trace_c) = self.traces(signal)?;
        let phase = phase_estimate(&trace_s, &trace_c);
        Ok(QuadratureEstimate {
            phase,
            delay: phase_to_delay(phase, self.frequency),
            amplitude: amplitude_estimate(&trace_s, &trace_c),
            confidence: confidence_index(&trace_s, &trace_c),
        })
    }

    /// [`demodulate`](Self::demodulate) for every channel.
    pub fn demodulate_all(&self, signals: &TimeSeries) -> Result<Vec<QuadratureEstimate>> {
        if signals.ncols() == 0 {
            return Err(OscillationError::EmptyData);
        }
        iter_maybe_parallel!(0..signals.ncols())
            .map(|j| self.demodulate(signals.column(j)))
            .collect()
    }
}

/// Sine and cosine traces of one channel.
pub fn make_traces(
    signal: &[f64],
    frequency: f64,
    tr: f64,
    offset: f64,
    config: &QuadratureConfig,
) -> Result<(Vec<f64>, Vec<f64>)> {
    QuadratureDemodulator::new(frequency, tr, offset, config)?.traces(signal)
}

/// Delay, amplitude and confidence index of every channel at `frequency`.
pub fn confidence_and_estimates(
    signals: &TimeSeries,
    frequency: f64,
    tr: f64,
    offset: f64,
    config: &QuadratureConfig,
) -> Result<Vec<QuadratureEstimate>> {
    QuadratureDemodulator::new(frequency, tr, offset, config)?.demodulate_all(signals)
}
