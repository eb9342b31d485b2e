//! The [`Oscillation`] analysis pipeline.
//!
//! An `Oscillation` owns a raw recording plus its stimulus timing, and a
//! current, transformed copy of it. Transform methods replace the current
//! copy, keep the row grid (time, trial-relative time or frequency) in step
//! with it, and record their name in the transformation chain:
//!
//! ```
//! use fluctus_core::simulation::{sim_periodic_response, ResponseSpec};
//! use fluctus_core::Oscillation;
//!
//! let data = sim_periodic_response(1200, 1.0, 10.0, 14.0, &[ResponseSpec::default(); 4], 0.1, Some(1));
//! let mut osc = Oscillation::new(data, 1.0, Some(10.0)).unwrap();
//! let cycle = osc.preprocess().unwrap();
//!
//! assert_eq!(cycle.len(), 100);
//! assert_eq!(osc.grid().len(), 100);
//! assert!(osc.emin().is_some());
//! ```

use crate::config::OscillationConfig;
use crate::delay::find_delay;
use crate::error::{OscillationError, Result};
use crate::folding::TrialFolder;
use crate::grid::{steady_state_offset_with, trial_count};
use crate::helpers::{argmin, grid_spacing, percentile, uniform_grid};
use crate::masker::Masker;
use crate::matrix::TimeSeries;
use crate::quadrature::{confidence_and_estimates, QuadratureEstimate};
use crate::resample::PeriodicGridResampler;
use crate::spectral::SpectralTransform;
use crate::transform::{Averager, Detrender, PscNormalizer, Transform, TransformKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// Stimulus-locked analysis of a multi-channel recording.
#[derive(Debug, Clone)]
pub struct Oscillation {
    data: TimeSeries,
    tr: f64,
    period: Option<f64>,
    config: OscillationConfig,
    labels: Option<Vec<String>>,
    offset: f64,
    n_trials: usize,

    tdata: TimeSeries,
    grid: Vec<f64>,
    sampling_rate: f64,
    chain: Vec<TransformKind>,
    emin: Option<TimeSeries>,
    emax: Option<TimeSeries>,
    ids: Vec<String>,
    base_ids: Vec<String>,

    masker: Option<Arc<dyn Masker>>,
}

impl Oscillation {
    /// Pipeline over `data` (samples × channels) sampled every `tr` seconds,
    /// with the default configuration. `period: None` selects aperiodic mode.
    pub fn new(data: TimeSeries, tr: f64, period: Option<f64>) -> Result<Self> {
        Self::with_config(data, tr, period, OscillationConfig::default())
    }

    pub fn with_config(
        data: TimeSeries,
        tr: f64,
        period: Option<f64>,
        config: OscillationConfig,
    ) -> Result<Self> {
        config.validate()?;
        if !(tr.is_finite() && tr > 0.0) {
            return Err(OscillationError::InvalidTiming {
                parameter: "tr",
                value: tr,
            });
        }
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(OscillationError::EmptyData);
        }

        let offset = steady_state_offset_with(
            config.stimulus_offset,
            period,
            config.discard_transients,
            config.transient_duration,
        )?;
        let n_trials = period.map_or(0, |p| trial_count(offset, p, tr, data.nrows()));
        debug!(
            samples = data.nrows(),
            channels = data.ncols(),
            tr,
            ?period,
            offset,
            n_trials,
            "oscillation created"
        );
        if period.is_some() && n_trials == 0 {
            warn!(offset, "no complete stimulus cycle after the steady-state offset");
        }

        Ok(Self {
            grid: uniform_grid(0.0, tr, data.nrows()),
            tdata: data.clone(),
            data,
            tr,
            period,
            config,
            labels: None,
            offset,
            n_trials,
            sampling_rate: tr,
            chain: Vec::new(),
            emin: None,
            emax: None,
            ids: vec![String::new()],
            base_ids: vec![String::new()],
            masker: None,
        })
    }

    /// Attach one group label per channel; `average` then yields one column per label.
    pub fn with_labels(mut self, labels: Vec<String>) -> Result<Self> {
        if labels.len() != self.data.ncols() {
            return Err(OscillationError::ShapeMismatch {
                expected: self.data.ncols(),
                actual: labels.len(),
                context: "Oscillation::with_labels (labels vs channels)",
            });
        }
        self.labels = Some(labels);
        Ok(self)
    }

    /// Extract channels through `masker` and keep it for [`inverse_transform`](Self::inverse_transform).
    ///
    /// A masker that already averages per label starts the pipeline with
    /// "Label Average" in the chain and the labels as ids.
    pub fn from_masker<M>(mut masker: M, period: Option<f64>, config: OscillationConfig) -> Result<Self>
    where
        M: Masker + 'static,
    {
        let masked = masker.fit_transform()?;
        let mut osc = Self::with_config(masked.data, masked.tr, period, config)?;
        if let Some(labels) = masked.labels {
            osc = osc.with_labels(labels)?;
        }
        if masked.labelled {
            osc.chain.push(TransformKind::LabelAverage);
            if let Some(labels) = &osc.labels {
                osc.ids = labels.clone();
                osc.base_ids = labels.clone();
            }
        }
        osc.masker = Some(Arc::new(masker));
        Ok(osc)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The untransformed recording.
    pub fn data(&self) -> &TimeSeries {
        &self.data
    }

    /// The current, transformed data.
    pub fn tdata(&self) -> &TimeSeries {
        &self.tdata
    }

    /// Alias of [`tdata`](Self::tdata).
    pub fn transformed_data(&self) -> &TimeSeries {
        &self.tdata
    }

    /// Row coordinates of [`tdata`](Self::tdata): seconds, or Hz after `fft`.
    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    /// Spacing of [`grid`](Self::grid).
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn tr(&self) -> f64 {
        self.tr
    }

    pub fn period(&self) -> Option<f64> {
        self.period
    }

    /// Start of the steady-state response, in seconds.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Complete stimulus cycles after [`offset`](Self::offset).
    pub fn n_trials(&self) -> usize {
        self.n_trials
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    /// Identifiers of the current columns after averaging.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Lower bootstrap bound of the trial average.
    pub fn emin(&self) -> Option<&TimeSeries> {
        self.emin.as_ref()
    }

    /// Upper bootstrap bound of the trial average.
    pub fn emax(&self) -> Option<&TimeSeries> {
        self.emax.as_ref()
    }

    pub fn transformation_chain(&self) -> &[TransformKind] {
        &self.chain
    }

    pub fn config(&self) -> &OscillationConfig {
        &self.config
    }

    /// Whether `kind` has been applied since construction or the last reset.
    pub fn has_applied(&self, kind: TransformKind) -> bool {
        self.chain.contains(&kind)
    }

    /// Forget the channel labels, so the next `average` collapses everything.
    pub fn clear_labels(&mut self) -> &mut Self {
        self.labels = None;
        self
    }

    // ------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------

    /// Fit (if needed) and apply `transformer` to the current data, recording it.
    fn apply_transform(&mut self, transformer: &mut dyn Transform) -> Result<()> {
        if !transformer.is_fitted() {
            transformer.fit(&self.tdata)?;
        }
        self.tdata = transformer.apply(&self.tdata)?;
        let kind = transformer.kind();
        self.chain.push(kind);
        debug!(
            transform = %kind,
            rows = self.tdata.nrows(),
            channels = self.tdata.ncols(),
            "applied transform"
        );
        Ok(())
    }

    fn skip_if_applied(&self, kind: TransformKind) -> bool {
        let applied = kind.is_idempotence_sensitive() && self.has_applied(kind);
        if applied {
            debug!(transform = %kind, "already applied, skipping");
        }
        applied
    }

    fn sync_sampling_rate(&mut self) {
        if let Some(dt) = grid_spacing(&self.grid) {
            self.sampling_rate = dt;
        }
    }

    /// Restore the untransformed data, grid, sampling rate and column ids, and clear the chain.
    pub fn reset(&mut self) -> &mut Self {
        self.tdata = self.data.clone();
        self.chain.clear();
        self.sampling_rate = self.tr;
        self.grid = uniform_grid(0.0, self.tr, self.data.nrows());
        self.emin = None;
        self.emax = None;
        self.ids = self.base_ids.clone();
        self
    }

    /// Average channels, per label when labels are set.
    pub fn average(&mut self) -> Result<&mut Self> {
        let mut averager = match &self.labels {
            Some(labels) => Averager::by_labels(labels),
            None => Averager::new(),
        };
        self.apply_transform(&mut averager)?;
        self.ids = averager.ids();
        Ok(self)
    }

    /// Percent signal change relative to the mean over `[baseline_begin, baseline_end)` seconds.
    ///
    /// Applied at most once per pipeline.
    pub fn psc(&mut self, baseline_begin: f64, baseline_end: f64) -> Result<&mut Self> {
        if self.skip_if_applied(TransformKind::Psc) {
            return Ok(self);
        }
        let mut psc = PscNormalizer::new();
        psc.fit_window(&self.tdata, self.sampling_rate, baseline_begin, baseline_end)?;
        self.apply_transform(&mut psc)?;
        Ok(self)
    }

    /// Remove a polynomial trend of the given order. Applied at most once per pipeline.
    pub fn detrend(&mut self, order: usize, keep_mean: bool) -> Result<&mut Self> {
        if self.skip_if_applied(TransformKind::Detrend) {
            return Ok(self);
        }
        self.apply_transform(&mut Detrender::new(order, keep_mean))?;
        Ok(self)
    }

    /// [`detrend`](Self::detrend) with the order and `keep_mean` from the configuration.
    pub fn detrend_default(&mut self) -> Result<&mut Self> {
        let (order, keep_mean) = (self.config.detrend_order, self.config.detrend_keep_mean);
        self.detrend(order, keep_mean)
    }

    /// Fold the data into one stimulus cycle, averaging over trials.
    ///
    /// With `bootstrap`, [`emin`](Self::emin)/[`emax`](Self::emax) hold the
    /// percentile bounds afterwards; otherwise they are cleared.
    pub fn trial_average(&mut self, bootstrap: bool) -> Result<&mut Self> {
        let mut folder = if bootstrap {
            TrialFolder::with_bootstrap(self.n_trials, self.config.bootstrap.clone())
        } else {
            TrialFolder::new(self.n_trials, false)
        };
        self.apply_transform(&mut folder)?;
        self.emin = folder.ci_low().cloned();
        self.emax = folder.ci_high().cloned();
        self.grid.truncate(self.tdata.nrows());
        self.sync_sampling_rate();
        Ok(self)
    }

    /// Crop to whole steady-state cycles and resample every `target_sampling_out` seconds.
    ///
    /// The new grid starts at 0 at the steady-state offset. Without a period
    /// there is no cycle to align to and the data is left untouched.
    pub fn interp(&mut self, target_sampling_out: f64) -> Result<&mut Self> {
        let Some(period) = self.period else {
            debug!("aperiodic recording, interpolation skipped");
            return Ok(self);
        };
        let mut resampler =
            PeriodicGridResampler::new(period, self.tr, target_sampling_out, self.offset)?;
        self.apply_transform(&mut resampler)?;
        let target = resampler
            .target_grid()
            .ok_or(OscillationError::InsufficientTrials { n_trials: 0 })?;
        self.grid = target.iter().map(|&t| t - self.offset).collect();
        self.sync_sampling_rate();
        Ok(self)
    }

    /// Replace each channel by its amplitude spectrum; the grid becomes Hz.
    pub fn fft(&mut self) -> Result<&mut Self> {
        let mut spectral = SpectralTransform::new(self.sampling_rate)?;
        self.apply_transform(&mut spectral)?;
        self.grid = spectral
            .frequencies()
            .map(<[f64]>::to_vec)
            .ok_or(OscillationError::EmptyData)?;
        self.sync_sampling_rate();
        Ok(self)
    }

    /// Reset, resample, convert to percent signal change over the whole
    /// series, average channels and fold trials with bootstrap bounds.
    ///
    /// Returns the trial-averaged data with singleton dimensions dropped.
    pub fn preprocess(&mut self) -> Result<Vec<f64>> {
        let target = self.config.target_sampling_out;
        self.reset()
            .interp(target)?
            .psc(0.0, f64::INFINITY)?
            .average()?
            .trial_average(true)?;
        Ok(self.tdata.squeeze())
    }

    // ------------------------------------------------------------------
    // Derived metrics
    // ------------------------------------------------------------------

    /// Grid coordinate of each channel's minimum.
    pub fn phase(&self) -> Vec<f64> {
        self.tdata
            .columns()
            .map(|col| argmin(col).map_or(f64::NAN, |i| self.grid[i]))
            .collect()
    }

    /// Peak-to-peak range of each channel.
    pub fn amplitude(&self) -> Vec<f64> {
        self.tdata
            .columns()
            .map(|col| {
                if col.iter().any(|v| v.is_nan()) {
                    return f64::NAN;
                }
                let (lo, hi) = col
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                        (lo.min(v), hi.max(v))
                    });
                hi - lo
            })
            .collect()
    }

    /// 10th-to-90th percentile range of each channel.
    pub fn robust_amplitude(&self) -> Vec<f64> {
        self.tdata
            .columns()
            .map(|col| percentile(col, 90.0) - percentile(col, 10.0))
            .collect()
    }

    /// `(x, y)` axis labels matching the current units.
    pub fn axis_labels(&self) -> (&'static str, &'static str) {
        let x = if self.has_applied(TransformKind::Fft) {
            "Frequency (Hz)"
        } else {
            "Time (s)"
        };
        let y = if self.has_applied(TransformKind::Psc) {
            "BOLD % Amplitude"
        } else {
            "Amplitude"
        };
        (x, y)
    }

    /// Delay (seconds) of each current channel relative to `reference`.
    ///
    /// The reference defaults to the mean across channels. Shifts up to
    /// `max_shift_seconds` either way are searched on the current grid.
    pub fn get_crosscorr(&self, reference: Option<&[f64]>) -> Result<Vec<f64>> {
        let dt = grid_spacing(&self.grid).ok_or(OscillationError::InsufficientData {
            required: 2,
            actual: self.grid.len(),
            context: "Oscillation::get_crosscorr (grid spacing)",
        })?;
        let mean_trace;
        let reference = match reference {
            Some(r) => r,
            None => {
                mean_trace = self.tdata.row_means();
                &mean_trace
            }
        };
        let delay = &self.config.delay;
        let maxshift = (delay.max_shift_seconds / dt) as usize;
        find_delay(
            &self.tdata,
            reference,
            maxshift,
            dt,
            delay.scale_reference,
            delay.rect_data,
        )
    }

    /// Quadrature estimates of every raw channel at the stimulus frequency.
    pub fn confidence_and_estimates(&self) -> Result<Vec<QuadratureEstimate>> {
        let period = self.period.ok_or(OscillationError::InvalidTiming {
            parameter: "period",
            value: f64::NAN,
        })?;
        confidence_and_estimates(
            &self.data,
            1.0 / period,
            self.tr,
            self.config.stimulus_offset,
            &self.config.quadrature,
        )
    }

    /// Map per-channel results back through the masker this pipeline was built from.
    pub fn inverse_transform(&self, values: &TimeSeries) -> Result<TimeSeries> {
        self.masker
            .as_ref()
            .ok_or(OscillationError::MissingMasker)?
            .inverse_transform(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masker::{LabelsMasker, VolumeMasker};
    use crate::simulation::{sim_periodic_response, ResponseSpec};

    fn labels(ls: &[&str]) -> Vec<String> {
        ls.iter().map(|s| s.to_string()).collect()
    }

    fn simulated(n: usize, channels: usize) -> TimeSeries {
        sim_periodic_response(n, 1.0, 10.0, 14.0, &vec![ResponseSpec::default(); channels], 0.0, None)
    }

    #[test]
    fn test_construction_state() {
        let osc = Oscillation::new(simulated(100, 2), 1.0, Some(10.0)).unwrap();
        assert_eq!(osc.offset(), 54.0);
        // (99 - 54) / 10 = 4.5
        assert_eq!(osc.n_trials(), 4);
        assert_eq!(osc.grid().len(), 100);
        assert_eq!(osc.sampling_rate(), 1.0);
        assert!(osc.transformation_chain().is_empty());
        assert_eq!(osc.ids(), &[String::new()]);
        assert_eq!(osc.axis_labels(), ("Time (s)", "Amplitude"));
    }

    #[test]
    fn test_construction_rejects_bad_input() {
        assert!(Oscillation::new(simulated(10, 1), 0.0, Some(10.0)).is_err());
        assert!(Oscillation::new(simulated(10, 1), 1.0, Some(-1.0)).is_err());
        assert!(matches!(
            Oscillation::new(TimeSeries::zeros(0, 3), 1.0, None),
            Err(OscillationError::EmptyData)
        ));
        assert!(Oscillation::new(simulated(10, 2), 1.0, None)
            .unwrap()
            .with_labels(labels(&["a"]))
            .is_err());
    }

    #[test]
    fn test_average_with_labels_sets_ids() {
        let mut osc = Oscillation::new(simulated(60, 3), 1.0, None)
            .unwrap()
            .with_labels(labels(&["v1", "v2", "v1"]))
            .unwrap();
        osc.average().unwrap();
        assert_eq!(osc.tdata().ncols(), 2);
        assert_eq!(osc.ids(), &labels(&["v1", "v2"])[..]);

        osc.reset().clear_labels().average().unwrap();
        assert_eq!(osc.tdata().ncols(), 1);
        assert_eq!(osc.ids(), &[String::new()]);
    }

    #[test]
    fn test_reset_restores_ids() {
        let mut osc = Oscillation::new(simulated(60, 3), 1.0, None)
            .unwrap()
            .with_labels(labels(&["v1", "v2", "v1"]))
            .unwrap();
        osc.average().unwrap();
        assert_eq!(osc.ids(), &labels(&["v1", "v2"])[..]);
        osc.reset();
        assert_eq!(osc.tdata().ncols(), 3);
        assert_eq!(osc.ids(), &[String::new()]);
    }

    #[test]
    fn test_detrend_default_follows_config() {
        let specs = [ResponseSpec {
            drift: 0.2,
            ..ResponseSpec::default()
        }];
        let data = sim_periodic_response(120, 1.0, 10.0, 14.0, &specs, 0.0, None);
        let raw_mean = crate::helpers::mean(data.column(0));

        let mut keep = Oscillation::new(data.clone(), 1.0, Some(10.0)).unwrap();
        keep.detrend_default().unwrap();
        assert!((crate::helpers::mean(keep.tdata().column(0)) - raw_mean).abs() < 1e-6);

        let config = OscillationConfig {
            detrend_order: 1,
            detrend_keep_mean: false,
            ..OscillationConfig::default()
        };
        let mut centered = Oscillation::with_config(data.clone(), 1.0, Some(10.0), config).unwrap();
        centered.detrend_default().unwrap();
        assert!(crate::helpers::mean(centered.tdata().column(0)).abs() < 1e-6);
        assert_eq!(centered.transformation_chain(), &[TransformKind::Detrend]);

        // Same keep_mean, different order: the cubic fit removes a different trend
        let mut linear = Oscillation::with_config(
            data,
            1.0,
            Some(10.0),
            OscillationConfig {
                detrend_order: 1,
                ..OscillationConfig::default()
            },
        )
        .unwrap();
        linear.detrend_default().unwrap();
        assert_ne!(linear.tdata(), keep.tdata());
    }

    #[test]
    fn test_labelled_masker_reset_keeps_label_ids() {
        let masker = LabelsMasker::new(simulated(120, 4), 1.0, vec![1, 1, 2, 2])
            .unwrap()
            .with_names(labels(&["left", "right"]));
        let mut osc = Oscillation::from_masker(masker, Some(10.0), OscillationConfig::default())
            .unwrap();
        osc.reset();
        assert_eq!(osc.ids(), &labels(&["left", "right"])[..]);
        assert_eq!(osc.tdata().ncols(), 2);
    }

    #[test]
    fn test_psc_sets_axis_label_and_skips_repeat() {
        let mut osc = Oscillation::new(simulated(60, 1), 1.0, None).unwrap();
        osc.psc(0.0, f64::INFINITY).unwrap().psc(0.0, 10.0).unwrap();
        assert_eq!(osc.transformation_chain(), &[TransformKind::Psc]);
        assert_eq!(osc.axis_labels().1, "BOLD % Amplitude");
    }

    #[test]
    fn test_interp_aperiodic_is_identity() {
        let mut osc = Oscillation::new(simulated(60, 1), 1.0, None).unwrap();
        osc.interp(0.1).unwrap();
        assert!(osc.transformation_chain().is_empty());
        assert_eq!(osc.tdata(), osc.data());
    }

    #[test]
    fn test_interp_and_fold_grid() {
        let mut osc = Oscillation::new(simulated(200, 1), 1.0, Some(10.0)).unwrap();
        // (199 - 54) / 10 = 14.5 -> 14 trials
        assert_eq!(osc.n_trials(), 14);
        osc.interp(0.5).unwrap();
        assert_eq!(osc.tdata().nrows(), 14 * 20);
        assert_eq!(osc.grid()[0], 0.0);
        assert!((osc.sampling_rate() - 0.5).abs() < 1e-12);

        osc.trial_average(false).unwrap();
        assert_eq!(osc.tdata().nrows(), 20);
        assert_eq!(osc.grid().len(), 20);
        assert!(osc.emin().is_none());
        assert_eq!(
            osc.transformation_chain(),
            &[TransformKind::CropInterpolate, TransformKind::TrialAverage]
        );
    }

    #[test]
    fn test_fft_grid_in_hz() {
        let mut osc = Oscillation::new(simulated(200, 1), 1.0, Some(10.0)).unwrap();
        osc.interp(0.5).unwrap().fft().unwrap();
        // 280 rows at 0.5 s -> bins of 1 / 140 Hz
        assert_eq!(osc.tdata().nrows(), 141);
        assert_eq!(osc.grid().len(), 141);
        assert!((osc.sampling_rate() - 1.0 / 140.0).abs() < 1e-12);
        assert_eq!(osc.axis_labels().0, "Frequency (Hz)");
        // 14 cycles in 140 s: the response peaks at bin 14, 0.1 Hz
        let spectrum = osc.tdata().column(0);
        let peak = (1..spectrum.len())
            .max_by(|&a, &b| spectrum[a].total_cmp(&spectrum[b]))
            .unwrap();
        assert_eq!(peak, 14);
    }

    #[test]
    fn test_phase_and_amplitudes() {
        let ts = TimeSeries::from_columns(&[vec![3.0, 1.0, 2.0, 5.0], vec![0.0, 0.0, -4.0, 0.0]])
            .unwrap();
        let osc = Oscillation::new(ts, 0.5, None).unwrap();
        assert_eq!(osc.phase(), vec![0.5, 1.0]);
        assert_eq!(osc.amplitude(), vec![4.0, 4.0]);
        let robust = osc.robust_amplitude();
        // channel 0 sorted: 1, 2, 3, 5 -> p10 = 1.3, p90 = 4.4
        assert!((robust[0] - 3.1).abs() < 1e-12);
    }

    #[test]
    fn test_crosscorr_default_reference() {
        let specs = [
            ResponseSpec::default(),
            ResponseSpec {
                delay: 2.0,
                ..ResponseSpec::default()
            },
        ];
        let data = sim_periodic_response(200, 1.0, 20.0, 0.0, &specs, 0.0, None);
        let osc = Oscillation::new(data.clone(), 1.0, Some(20.0)).unwrap();
        let reference = data.column(0).to_vec();
        let delays = osc.get_crosscorr(Some(&reference)).unwrap();
        assert!(delays[0].abs() < 1e-12);
        assert!((delays[1] - 2.0).abs() < 1e-12);

        // Against the mean of both, the two channels sit symmetrically around it
        let delays = osc.get_crosscorr(None).unwrap();
        assert!((delays[1] - delays[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_quadrature_requires_period() {
        let osc = Oscillation::new(simulated(600, 1), 1.0, None).unwrap();
        assert!(matches!(
            osc.confidence_and_estimates(),
            Err(OscillationError::InvalidTiming { parameter: "period", .. })
        ));
    }

    #[test]
    fn test_masker_roundtrip() {
        let volume = simulated(120, 4);
        let masker = VolumeMasker::new(volume, 1.0, vec![true, true, false, true]).unwrap();
        let mut osc = Oscillation::from_masker(masker, Some(10.0), OscillationConfig::default())
            .unwrap();
        assert_eq!(osc.data().ncols(), 3);
        let back = osc.inverse_transform(osc.tdata()).unwrap();
        assert_eq!(back.ncols(), 4);

        osc.average().unwrap();
        assert!(Oscillation::new(simulated(10, 1), 1.0, None)
            .unwrap()
            .inverse_transform(osc.tdata())
            .is_err());
    }

    #[test]
    fn test_labelled_masker_starts_averaged() {
        let volume = simulated(120, 4);
        let masker = LabelsMasker::new(volume, 1.0, vec![1, 1, 2, 2])
            .unwrap()
            .with_names(labels(&["left", "right"]));
        let osc = Oscillation::from_masker(masker, Some(10.0), OscillationConfig::default())
            .unwrap();
        assert_eq!(osc.transformation_chain(), &[TransformKind::LabelAverage]);
        assert_eq!(osc.ids(), &labels(&["left", "right"])[..]);
        assert_eq!(osc.tdata().ncols(), 2);
    }
}
