//! # fluctus-core
//!
//! Analysis of quasi-periodic responses to a repeating stimulus, in Rust.
//!
//! Given a multi-channel recording (samples × channels), its sampling interval
//! and the stimulus period, this crate provides:
//! - Stimulus-aligned timing (steady-state offset, trial counting)
//! - Channel and label-group averaging, percent signal change, polynomial detrending
//! - Monotone resampling onto a whole-cycle periodic grid
//! - Trial folding with bootstrap confidence bounds
//! - One-sided amplitude spectra
//! - Cross-correlation delay estimation
//! - Quadrature demodulation (phase, amplitude, Regan's confidence index)
//! - The [`Oscillation`] pipeline that chains all of the above
//!
//! ## Data Layout
//!
//! Recordings are [`TimeSeries`]: column-major matrices stored in flat vectors,
//! so `data[i + j * n]` is sample `i` of channel `j` and each channel is a
//! contiguous slice.

#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod parallel;

pub mod config;
pub mod delay;
pub mod error;
pub mod filter;
pub mod folding;
pub mod grid;
pub mod helpers;
pub mod masker;
pub mod matrix;
pub mod oscillation;
pub mod quadrature;
pub mod resample;
pub mod simulation;
pub mod spectral;
pub mod transform;

// Re-export commonly used items
pub use config::{BootstrapConfig, DelayConfig, OscillationConfig, QuadratureConfig};
pub use error::{OscillationError, Result};
pub use matrix::TimeSeries;
pub use oscillation::Oscillation;

// Re-export the transform primitives
pub use folding::TrialFolder;
pub use resample::{Pchip, PeriodicGridResampler};
pub use spectral::SpectralTransform;
pub use transform::{Averager, Detrender, FitState, PscNormalizer, Transform, TransformKind};

// Re-export the standalone estimators
pub use delay::{correlate, find_delay, standardize, DelayEstimator};
pub use grid::{steady_state_offset, trial_count};
pub use masker::{LabelsMasker, MaskedSeries, Masker, VolumeMasker};
pub use quadrature::{confidence_and_estimates, make_traces, QuadratureDemodulator, QuadratureEstimate};
