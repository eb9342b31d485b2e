//! Analysis configuration.
//!
//! All knobs of the pipeline live in [`OscillationConfig`]. Every field has a
//! default, so a JSON document only needs to name what it overrides:
//!
//! ```
//! use fluctus_core::config::OscillationConfig;
//!
//! let cfg = OscillationConfig::from_json_str(r#"{ "stimulus_offset": 10.0, "bootstrap": { "seed": 7 } }"#).unwrap();
//! assert_eq!(cfg.stimulus_offset, 10.0);
//! assert_eq!(cfg.bootstrap.iterations, 1000);
//! assert_eq!(cfg.bootstrap.seed, Some(7));
//! ```

use crate::error::{OscillationError, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Bootstrap settings for trial folding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Number of resampling iterations.
    pub iterations: usize,
    /// Lower percentile reported as `ci_low` (0-100).
    pub ci_low: f64,
    /// Upper percentile reported as `ci_high` (0-100).
    pub ci_high: f64,
    /// Base seed; `None` draws one from entropy.
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            ci_low: 2.5,
            ci_high: 97.5,
            seed: None,
        }
    }
}

/// Cross-correlation delay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// Largest lag searched in either direction, in seconds.
    pub max_shift_seconds: f64,
    /// Standardize the reference before correlating.
    pub scale_reference: bool,
    /// Zero the negative part of the standardized signal.
    pub rect_data: bool,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            max_shift_seconds: 5.0,
            scale_reference: true,
            rect_data: false,
        }
    }
}

/// Quadrature demodulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadratureConfig {
    /// Moving-average window, in samples; also trimmed from each trace end.
    pub window: usize,
    /// Butterworth low-pass order.
    pub filter_order: usize,
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        Self {
            window: 50,
            filter_order: 4,
        }
    }
}

/// Full configuration of an [`Oscillation`](crate::Oscillation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillationConfig {
    /// Seconds from recording start to the first stimulus cycle.
    pub stimulus_offset: f64,
    /// Skip the non-steady-state cycles at the start of stimulation.
    pub discard_transients: bool,
    /// Length of the transient period skipped when `discard_transients` is set.
    pub transient_duration: f64,
    /// Sampling interval of the periodic grid produced by `interp`.
    pub target_sampling_out: f64,
    pub detrend_order: usize,
    pub detrend_keep_mean: bool,
    pub bootstrap: BootstrapConfig,
    pub delay: DelayConfig,
    pub quadrature: QuadratureConfig,
}

impl Default for OscillationConfig {
    fn default() -> Self {
        Self {
            stimulus_offset: 14.0,
            discard_transients: true,
            transient_duration: 40.0,
            target_sampling_out: 0.1,
            detrend_order: 3,
            detrend_keep_mean: true,
            bootstrap: BootstrapConfig::default(),
            delay: DelayConfig::default(),
            quadrature: QuadratureConfig::default(),
        }
    }
}

impl OscillationConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate JSON from a reader.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let cfg: Self = serde_json::from_reader(reader)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values no analysis can run with.
    pub fn validate(&self) -> Result<()> {
        if !self.stimulus_offset.is_finite() {
            return Err(OscillationError::InvalidTiming {
                parameter: "stimulus_offset",
                value: self.stimulus_offset,
            });
        }
        if !(self.transient_duration.is_finite() && self.transient_duration >= 0.0) {
            return Err(OscillationError::InvalidTiming {
                parameter: "transient_duration",
                value: self.transient_duration,
            });
        }
        if !(self.target_sampling_out.is_finite() && self.target_sampling_out > 0.0) {
            return Err(OscillationError::InvalidTiming {
                parameter: "target_sampling_out",
                value: self.target_sampling_out,
            });
        }
        if self.bootstrap.iterations == 0 {
            return Err(OscillationError::InvalidParameter {
                parameter: "bootstrap.iterations",
                message: "must be at least 1".to_string(),
            });
        }
        let (lo, hi) = (self.bootstrap.ci_low, self.bootstrap.ci_high);
        if !(0.0..=100.0).contains(&lo) || !(0.0..=100.0).contains(&hi) || lo > hi {
            return Err(OscillationError::InvalidParameter {
                parameter: "bootstrap.ci_low/ci_high",
                message: format!("percentiles must satisfy 0 <= low <= high <= 100, got {lo}/{hi}"),
            });
        }
        if !(self.delay.max_shift_seconds.is_finite() && self.delay.max_shift_seconds >= 0.0) {
            return Err(OscillationError::InvalidParameter {
                parameter: "delay.max_shift_seconds",
                message: format!("must be finite and non-negative, got {}", self.delay.max_shift_seconds),
            });
        }
        if self.quadrature.window == 0 {
            return Err(OscillationError::InvalidParameter {
                parameter: "quadrature.window",
                message: "must be at least 1 sample".to_string(),
            });
        }
        if self.quadrature.filter_order == 0 {
            return Err(OscillationError::InvalidParameter {
                parameter: "quadrature.filter_order",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
