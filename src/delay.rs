//! Cross-correlation delay estimation.
//!
//! Every channel is correlated against circular shifts of a reference trace;
//! the shift with the highest Pearson correlation gives the channel's delay.
//! A positive delay means the channel lags the reference.
//!
//! Channels with zero variance have an undefined correlation at every shift.
//! Their delay is reported as `NaN`.

use crate::error::{OscillationError, Result};
use crate::helpers::{argmax, mean, std_dev};
use crate::iter_maybe_parallel;
use crate::matrix::TimeSeries;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;

/// Pearson correlation of two equally long traces.
///
/// `NaN` when either trace has zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let ma = mean(a);
    let mb = mean(b);
    let mut num = 0.0;
    let mut ssa = 0.0;
    let mut ssb = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x - ma;
        let dy = y - mb;
        num += dx * dy;
        ssa += dx * dx;
        ssb += dy * dy;
    }
    num / (ssa * ssb).sqrt()
}

/// Correlation of every channel of `data` with `reference`.
pub fn correlate(data: &TimeSeries, reference: &[f64]) -> Result<Vec<f64>> {
    if reference.len() != data.nrows() {
        return Err(OscillationError::ShapeMismatch {
            expected: data.nrows(),
            actual: reference.len(),
            context: "correlate (reference length vs samples)",
        });
    }
    Ok(data.columns().map(|col| pearson(col, reference)).collect())
}

/// Zero mean, unit population variance. A constant input becomes all zeros.
pub fn standardize(values: &[f64]) -> Vec<f64> {
    let mu = mean(values);
    let sd = std_dev(values);
    let scale = if sd > 0.0 && sd.is_finite() { sd } else { 1.0 };
    values.iter().map(|&v| (v - mu) / scale).collect()
}

/// `out[i] = values[(i + shift) mod n]`.
fn roll(values: &[f64], shift: i64) -> Vec<f64> {
    let n = values.len() as i64;
    (0..n)
        .map(|i| values[(i + shift).rem_euclid(n) as usize])
        .collect()
}

/// Lag search over a fixed window of circular shifts.
#[derive(Debug, Clone)]
pub struct DelayEstimator {
    maxshift: usize,
    tr: f64,
    scale_reference: bool,
    rect_data: bool,
}

impl DelayEstimator {
    /// Searches shifts `-maxshift..maxshift` samples; `tr` converts samples to seconds.
    pub fn new(maxshift: usize, tr: f64) -> Result<Self> {
        if maxshift == 0 {
            return Err(OscillationError::InvalidParameter {
                parameter: "maxshift",
                message: "at least one shift in each direction is required".to_string(),
            });
        }
        if !(tr.is_finite() && tr > 0.0) {
            return Err(OscillationError::InvalidTiming {
                parameter: "tr",
                value: tr,
            });
        }
        Ok(Self {
            maxshift,
            tr,
            scale_reference: true,
            rect_data: false,
        })
    }

    /// Standardize the reference before correlating (on by default).
    pub fn scale_reference(mut self, yes: bool) -> Self {
        self.scale_reference = yes;
        self
    }

    /// Zero the negative part of each standardized channel (off by default).
    pub fn rect_data(mut self, yes: bool) -> Self {
        self.rect_data = yes;
        self
    }

    /// Shifts searched, in ascending order.
    pub fn shifts(&self) -> std::ops::Range<i64> {
        let m = self.maxshift as i64;
        -m..m
    }

    /// Delay in seconds of each channel of `signal` relative to `reference`.
    ///
    /// Ties go to the first (most negative) shift.
    pub fn estimate(&self, signal: &TimeSeries, reference: &[f64]) -> Result<Vec<f64>> {
        if signal.nrows() == 0 || signal.ncols() == 0 {
            return Err(OscillationError::EmptyData);
        }
        if reference.len() != signal.nrows() {
            return Err(OscillationError::ShapeMismatch {
                expected: signal.nrows(),
                actual: reference.len(),
                context: "DelayEstimator::estimate (reference length vs samples)",
            });
        }

        let reference = if self.scale_reference {
            standardize(reference)
        } else {
            reference.to_vec()
        };
        let shifts: Vec<i64> = self.shifts().collect();
        let rolled: Vec<Vec<f64>> = shifts.iter().map(|&s| roll(&reference, s)).collect();
        let rect = self.rect_data;
        let tr = self.tr;

        let delays = iter_maybe_parallel!(0..signal.ncols())
            .map(|j| {
                let mut channel = standardize(signal.column(j));
                if rect {
                    for v in channel.iter_mut() {
                        *v = v.max(0.0);
                    }
                }
                let corrs: Vec<f64> = rolled.iter().map(|r| pearson(&channel, r)).collect();
                match argmax(&corrs) {
                    Some(i) if !corrs[i].is_nan() => -(shifts[i] as f64 * tr),
                    _ => f64::NAN,
                }
            })
            .collect();
        Ok(delays)
    }
}

/// Delay of every channel of `signal` relative to `reference`, in seconds.
///
/// Positive values mean the channel lags the reference.
pub fn find_delay(
    signal: &TimeSeries,
    reference: &[f64],
    maxshift: usize,
    tr: f64,
    scale_reference: bool,
    rect_data: bool,
) -> Result<Vec<f64>> {
    DelayEstimator::new(maxshift, tr)?
        .scale_reference(scale_reference)
        .rect_data(rect_data)
        .estimate(signal, reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn reference(n: usize, tr: f64, period: f64) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * i as f64 * tr / period).sin())
            .collect()
    }

    #[test]
    fn test_pearson_basics() {
        let a = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&a, &[2.0, 4.0, 6.0, 8.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &[4.0, 3.0, 2.0, 1.0]) + 1.0).abs() < 1e-12);
        assert!(pearson(&a, &[5.0; 4]).is_nan());
    }

    #[test]
    fn test_standardize_constant_is_zero() {
        assert_eq!(standardize(&[3.0, 3.0, 3.0]), vec![0.0, 0.0, 0.0]);
        let z = standardize(&[1.0, 2.0, 3.0]);
        assert!(mean(&z).abs() < 1e-12);
        assert!((std_dev(&z) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_roll_matches_definition() {
        assert_eq!(roll(&[1.0, 2.0, 3.0, 4.0], 1), vec![2.0, 3.0, 4.0, 1.0]);
        assert_eq!(roll(&[1.0, 2.0, 3.0, 4.0], -1), vec![4.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_leading_channel_has_negative_delay() {
        let tr = 0.5;
        let n = 200;
        let r = reference(n, tr, 20.0);
        // signal[i] = r[i + 3]: the channel runs 3 samples ahead
        let ts = TimeSeries::from_channel(roll(&r, 3));
        let d = find_delay(&ts, &r, 10, tr, true, false).unwrap();
        assert!((d[0] + 3.0 * tr).abs() < 1e-12, "delay {}", d[0]);
    }

    #[test]
    fn test_lagging_channel_has_positive_delay() {
        let tr = 0.5;
        let n = 200;
        let r = reference(n, tr, 20.0);
        let ts = TimeSeries::from_columns(&[roll(&r, -4), r.clone()]).unwrap();
        let d = find_delay(&ts, &r, 10, tr, true, false).unwrap();
        assert!((d[0] - 4.0 * tr).abs() < 1e-12);
        assert!(d[1].abs() < 1e-12);
    }

    #[test]
    fn test_rectified_and_unscaled_agree_on_clean_shift() {
        let tr = 1.0;
        let r = reference(120, tr, 30.0);
        let ts = TimeSeries::from_channel(roll(&r, -2));
        let d = find_delay(&ts, &r, 5, tr, false, true).unwrap();
        assert!((d[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_tied_shifts_pick_most_negative() {
        // Period of 4 samples: shifts -4 and 0 give bitwise identical rolls
        let r = [0.0, 1.0, 0.0, -1.0].repeat(25);
        let ts = TimeSeries::from_channel(r.clone());
        let est = DelayEstimator::new(4, 0.5).unwrap();
        assert_eq!(est.shifts().collect::<Vec<_>>(), vec![-4, -3, -2, -1, 0, 1, 2, 3]);
        assert_eq!(roll(&r, -4), roll(&r, 0));

        let d = est.estimate(&ts, &r).unwrap();
        assert_eq!(d[0], 2.0);
        assert_eq!(find_delay(&ts, &r, 4, 0.5, true, false).unwrap(), d);
    }

    #[test]
    fn test_constant_channel_is_nan() {
        let r = reference(50, 1.0, 10.0);
        let ts = TimeSeries::from_columns(&[vec![1.0; 50], r.clone()]).unwrap();
        let d = find_delay(&ts, &r, 3, 1.0, true, false).unwrap();
        assert!(d[0].is_nan());
        assert!(d[1].abs() < 1e-12);
    }

    #[test]
    fn test_invalid_inputs() {
        let ts = TimeSeries::from_channel(vec![1.0, 2.0, 3.0]);
        assert!(find_delay(&ts, &[1.0, 2.0], 1, 1.0, true, false).is_err());
        assert!(find_delay(&ts, &[1.0, 2.0, 3.0], 0, 1.0, true, false).is_err());
        assert!(find_delay(&ts, &[1.0, 2.0, 3.0], 1, 0.0, true, false).is_err());
    }
}
