//! Butterworth low-pass design and zero-phase second-order-section filtering.
//!
//! Filters are cascades of biquads in Direct Form II Transposed, with
//! coefficients normalized so `a0 = 1`. The design maps the analog Butterworth
//! prototype to the z-plane with the bilinear transform after pre-warping the
//! cutoff.

use crate::error::{OscillationError, Result};
use num_complex::Complex;
use std::f64::consts::PI;

/// One second-order section `(b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 2],
}

impl Biquad {
    pub fn new(b: [f64; 3], a: [f64; 2]) -> Self {
        Self { b, a }
    }

    /// Gain at DC.
    pub fn dc_gain(&self) -> f64 {
        (self.b[0] + self.b[1] + self.b[2]) / (1.0 + self.a[0] + self.a[1])
    }

    /// Internal state reached after a long run of unit input.
    fn step_state(&self) -> [f64; 2] {
        let g = self.dc_gain();
        let s1 = self.b[2] - self.a[1] * g;
        let s0 = self.b[1] - self.a[0] * g + s1;
        [s0, s1]
    }

    /// Whether both poles lie inside the unit circle.
    pub fn is_stable(&self) -> bool {
        self.a[1].abs() < 1.0 && self.a[0].abs() < 1.0 + self.a[1]
    }

    /// Whether this section is first order (no `z^-2` terms).
    fn is_first_order(&self) -> bool {
        self.b[2] == 0.0 && self.a[1] == 0.0
    }

    /// Filter `x` in place starting from `state`.
    fn run(&self, x: &mut [f64], mut state: [f64; 2]) {
        for v in x.iter_mut() {
            let input = *v;
            let output = self.b[0] * input + state[0];
            state[0] = self.b[1] * input - self.a[0] * output + state[1];
            state[1] = self.b[2] * input - self.a[1] * output;
            *v = output;
        }
    }
}

/// Pre-warped analog cutoff (rad/s) for the bilinear transform.
fn prewarp(freq_hz: f64, sample_rate: f64) -> f64 {
    2.0 * sample_rate * (PI * freq_hz / sample_rate).tan()
}

/// Left-half-plane poles of the unit-cutoff Butterworth prototype, one per
/// conjugate pair (positive imaginary part), followed by the real pole when
/// `order` is odd.
fn butterworth_poles(order: usize) -> Vec<Complex<f64>> {
    let mut poles: Vec<Complex<f64>> = (0..order / 2)
        .map(|k| {
            let theta = PI / 2.0 + PI * (2 * k + 1) as f64 / (2 * order) as f64;
            Complex::new(theta.cos(), theta.sin())
        })
        .collect();
    if order % 2 == 1 {
        poles.push(Complex::new(-1.0, 0.0));
    }
    poles
}

/// `-p / (s - p)` (unit DC gain for a real pole `p < 0`), through the bilinear transform.
fn bilinear_1pole(p: f64, k: f64) -> Biquad {
    let alpha = k - p;
    let beta = k + p;
    Biquad::new([-p / alpha, -p / alpha, 0.0], [-beta / alpha, 0.0])
}

/// `|p|^2 / (s^2 - 2 Re(p) s + |p|^2)`, through the bilinear transform.
fn bilinear_2pole(p: Complex<f64>, k: f64) -> Biquad {
    let mag_sq = p.norm_sqr();
    let k2 = k * k;
    let d = k2 - 2.0 * k * p.re + mag_sq;
    let b0 = mag_sq / d;
    Biquad::new(
        [b0, 2.0 * b0, b0],
        [(2.0 * mag_sq - 2.0 * k2) / d, (k2 + 2.0 * k * p.re + mag_sq) / d],
    )
}

/// Butterworth low-pass of the given order as second-order sections.
///
/// `cutoff_hz` must lie strictly between 0 and the Nyquist frequency `fs / 2`.
pub fn butterworth_lowpass(order: usize, cutoff_hz: f64, fs: f64) -> Result<Vec<Biquad>> {
    if order == 0 {
        return Err(OscillationError::InvalidParameter {
            parameter: "order",
            message: "filter order must be at least 1".to_string(),
        });
    }
    if !(fs.is_finite() && fs > 0.0) {
        return Err(OscillationError::InvalidTiming {
            parameter: "fs",
            value: fs,
        });
    }
    if !(cutoff_hz > 0.0 && cutoff_hz < fs / 2.0) {
        return Err(OscillationError::InvalidParameter {
            parameter: "cutoff_hz",
            message: format!("must lie in (0, {}) for fs = {fs}, got {cutoff_hz}", fs / 2.0),
        });
    }
    let wc = prewarp(cutoff_hz, fs);
    let k = 2.0 * fs;
    Ok(butterworth_poles(order)
        .into_iter()
        .map(|p| {
            if p.im.abs() < 1e-12 {
                bilinear_1pole(p.re * wc, k)
            } else {
                bilinear_2pole(p * wc, k)
            }
        })
        .collect())
}

/// Initial states making a cascade start in steady state for unit input.
pub fn sosfilt_zi(sos: &[Biquad]) -> Vec<[f64; 2]> {
    let mut scale = 1.0;
    sos.iter()
        .map(|section| {
            let [s0, s1] = section.step_state();
            let zi = [scale * s0, scale * s1];
            scale *= section.dc_gain();
            zi
        })
        .collect()
}

/// Run the cascade over `x` in place, each section starting from `zi * x0`.
fn sosfilt_scaled(sos: &[Biquad], zi: &[[f64; 2]], x: &mut [f64], x0: f64) {
    for (section, z) in sos.iter().zip(zi) {
        section.run(x, [z[0] * x0, z[1] * x0]);
    }
}

/// Default edge padding: three times the number of filter taps.
fn default_padlen(sos: &[Biquad]) -> usize {
    let first_order = sos.iter().filter(|s| s.is_first_order()).count();
    3 * (2 * sos.len() + 1 - first_order)
}

/// Zero-phase filtering: forward, then backward, through the cascade.
///
/// The input is extended at both ends by odd reflection about its end points,
/// and each pass starts from the steady state matching its first sample, which
/// keeps edge transients small. Series shorter than the default padding use
/// `len - 1` samples of padding instead.
pub fn sosfiltfilt(sos: &[Biquad], x: &[f64]) -> Result<Vec<f64>> {
    let n = x.len();
    if n < 2 {
        return Err(OscillationError::InsufficientData {
            required: 2,
            actual: n,
            context: "sosfiltfilt",
        });
    }
    if sos.is_empty() {
        return Ok(x.to_vec());
    }
    let padlen = default_padlen(sos).min(n - 1);

    let first = x[0];
    let last = x[n - 1];
    let mut ext = Vec::with_capacity(n + 2 * padlen);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=padlen).map(|i| 2.0 * last - x[n - 1 - i]));

    let zi = sosfilt_zi(sos);
    let x0 = ext[0];
    sosfilt_scaled(sos, &zi, &mut ext, x0);

    ext.reverse();
    let y0 = ext[0];
    sosfilt_scaled(sos, &zi, &mut ext, y0);
    ext.reverse();

    Ok(ext[padlen..padlen + n].to_vec())
}
