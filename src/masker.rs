//! Boundary to the extraction collaborator.
//!
//! A [`Masker`] turns some spatial recording into a samples × channels
//! [`TimeSeries`] and maps per-channel results back into the spatial layout.
//! Reading imaging formats is not done here; the two maskers provided work on
//! volumes that are already in memory, flattened to samples × voxels.

use crate::error::{OscillationError, Result};
use crate::matrix::TimeSeries;
use std::fmt;

/// Output of [`Masker::fit_transform`].
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedSeries {
    pub data: TimeSeries,
    /// Sampling interval of `data`, in seconds.
    pub tr: f64,
    /// Per-channel group labels, if any.
    pub labels: Option<Vec<String>>,
    /// `data` already holds one channel per label.
    pub labelled: bool,
}

/// Extraction and inverse mapping between a spatial recording and channels.
pub trait Masker: fmt::Debug + Send + Sync {
    /// Fit the mask and extract the channel time series.
    fn fit_transform(&mut self) -> Result<MaskedSeries>;

    /// Map per-channel rows back onto every voxel (rows × voxels).
    fn inverse_transform(&self, values: &TimeSeries) -> Result<TimeSeries>;
}

fn check_volume(volume: &TimeSeries, map_len: usize, tr: f64) -> Result<()> {
    if volume.nrows() == 0 || volume.ncols() == 0 {
        return Err(OscillationError::EmptyData);
    }
    if map_len != volume.ncols() {
        return Err(OscillationError::ShapeMismatch {
            expected: volume.ncols(),
            actual: map_len,
            context: "masker (mask length vs voxels)",
        });
    }
    if !(tr.is_finite() && tr > 0.0) {
        return Err(OscillationError::InvalidTiming {
            parameter: "tr",
            value: tr,
        });
    }
    Ok(())
}

/// Keeps the voxels of a boolean mask, one channel per voxel.
#[derive(Debug, Clone)]
pub struct VolumeMasker {
    volume: TimeSeries,
    tr: f64,
    mask: Vec<bool>,
    labels: Option<Vec<String>>,
    selected: Vec<usize>,
}

impl VolumeMasker {
    /// `volume` is samples × voxels; `mask` has one entry per voxel.
    pub fn new(volume: TimeSeries, tr: f64, mask: Vec<bool>) -> Result<Self> {
        check_volume(&volume, mask.len(), tr)?;
        Ok(Self {
            volume,
            tr,
            mask,
            labels: None,
            selected: Vec::new(),
        })
    }

    /// Group labels for the extracted channels (one per selected voxel).
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Voxel indices kept by the last fit.
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }
}

impl Masker for VolumeMasker {
    fn fit_transform(&mut self) -> Result<MaskedSeries> {
        self.selected = self
            .mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect();
        if self.selected.is_empty() {
            return Err(OscillationError::Masker("mask selects no voxels".to_string()));
        }
        if let Some(labels) = &self.labels {
            if labels.len() != self.selected.len() {
                return Err(OscillationError::ShapeMismatch {
                    expected: self.selected.len(),
                    actual: labels.len(),
                    context: "VolumeMasker (labels vs selected voxels)",
                });
            }
        }
        Ok(MaskedSeries {
            data: self.volume.select_columns(&self.selected),
            tr: self.tr,
            labels: self.labels.clone(),
            labelled: false,
        })
    }

    fn inverse_transform(&self, values: &TimeSeries) -> Result<TimeSeries> {
        if self.selected.is_empty() {
            return Err(OscillationError::Masker("masker has not been fitted".to_string()));
        }
        if values.ncols() != self.selected.len() {
            return Err(OscillationError::ShapeMismatch {
                expected: self.selected.len(),
                actual: values.ncols(),
                context: "VolumeMasker::inverse_transform",
            });
        }
        let mut out = TimeSeries::zeros(values.nrows(), self.mask.len());
        for (j, &voxel) in self.selected.iter().enumerate() {
            out.column_mut(voxel).copy_from_slice(values.column(j));
        }
        Ok(out)
    }
}

/// Averages voxels per region of an integer label map; region 0 is background.
#[derive(Debug, Clone)]
pub struct LabelsMasker {
    volume: TimeSeries,
    tr: f64,
    label_map: Vec<u32>,
    names: Option<Vec<String>>,
    regions: Vec<u32>,
}

impl LabelsMasker {
    pub fn new(volume: TimeSeries, tr: f64, label_map: Vec<u32>) -> Result<Self> {
        check_volume(&volume, label_map.len(), tr)?;
        Ok(Self {
            volume,
            tr,
            label_map,
            names: None,
            regions: Vec::new(),
        })
    }

    /// Names for the regions, in ascending region order.
    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = Some(names);
        self
    }

    /// Region values found by the last fit, ascending.
    pub fn regions(&self) -> &[u32] {
        &self.regions
    }
}

impl Masker for LabelsMasker {
    fn fit_transform(&mut self) -> Result<MaskedSeries> {
        let mut regions: Vec<u32> = self.label_map.iter().copied().filter(|&r| r != 0).collect();
        regions.sort_unstable();
        regions.dedup();
        if regions.is_empty() {
            return Err(OscillationError::Masker("label map has no regions".to_string()));
        }
        let names = match &self.names {
            Some(names) if names.len() != regions.len() => {
                return Err(OscillationError::ShapeMismatch {
                    expected: regions.len(),
                    actual: names.len(),
                    context: "LabelsMasker (names vs regions)",
                });
            }
            Some(names) => names.clone(),
            None => regions.iter().map(u32::to_string).collect(),
        };
        let columns: Vec<Vec<f64>> = regions
            .iter()
            .map(|&r| {
                let voxels: Vec<usize> = self
                    .label_map
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &l)| (l == r).then_some(i))
                    .collect();
                self.volume.select_columns(&voxels).row_means()
            })
            .collect();
        self.regions = regions;
        Ok(MaskedSeries {
            data: TimeSeries::from_columns(&columns).ok_or(OscillationError::EmptyData)?,
            tr: self.tr,
            labels: Some(names),
            labelled: true,
        })
    }

    fn inverse_transform(&self, values: &TimeSeries) -> Result<TimeSeries> {
        if self.regions.is_empty() {
            return Err(OscillationError::Masker("masker has not been fitted".to_string()));
        }
        if values.ncols() != self.regions.len() {
            return Err(OscillationError::ShapeMismatch {
                expected: self.regions.len(),
                actual: values.ncols(),
                context: "LabelsMasker::inverse_transform",
            });
        }
        let mut out = TimeSeries::zeros(values.nrows(), self.label_map.len());
        for (voxel, &l) in self.label_map.iter().enumerate() {
            if let Ok(j) = self.regions.binary_search(&l) {
                out.column_mut(voxel).copy_from_slice(values.column(j));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume() -> TimeSeries {
        // 3 samples, 4 voxels
        TimeSeries::from_columns(&[
            vec![1.0, 2.0, 3.0],
            vec![10.0, 20.0, 30.0],
            vec![5.0, 5.0, 5.0],
            vec![3.0, 4.0, 5.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_volume_masker_roundtrip() {
        let mut masker = VolumeMasker::new(volume(), 2.0, vec![true, false, false, true]).unwrap();
        let masked = masker.fit_transform().unwrap();
        assert_eq!(masked.data.shape(), (3, 2));
        assert_eq!(masked.data.column(1), &[3.0, 4.0, 5.0]);
        assert!(!masked.labelled);

        let back = masker.inverse_transform(&masked.data).unwrap();
        assert_eq!(back.shape(), (3, 4));
        assert_eq!(back.column(0), &[1.0, 2.0, 3.0]);
        assert_eq!(back.column(1), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_volume_masker_errors() {
        assert!(VolumeMasker::new(volume(), 2.0, vec![true]).is_err());
        let mut empty = VolumeMasker::new(volume(), 2.0, vec![false; 4]).unwrap();
        assert!(matches!(empty.fit_transform(), Err(OscillationError::Masker(_))));
        let unfitted = VolumeMasker::new(volume(), 2.0, vec![true; 4]).unwrap();
        assert!(unfitted.inverse_transform(&volume()).is_err());
    }

    #[test]
    fn test_labels_masker_averages_regions() {
        let mut masker = LabelsMasker::new(volume(), 1.0, vec![2, 2, 0, 7])
            .unwrap()
            .with_names(vec!["visual".to_string(), "motor".to_string()]);
        let masked = masker.fit_transform().unwrap();
        assert!(masked.labelled);
        assert_eq!(masker.regions(), &[2, 7]);
        assert_eq!(masked.labels.as_deref(), Some(&["visual".to_string(), "motor".to_string()][..]));
        assert_eq!(masked.data.column(0), &[5.5, 11.0, 16.5]);

        let back = masker.inverse_transform(&masked.data).unwrap();
        assert_eq!(back.column(1), &[5.5, 11.0, 16.5]);
        assert_eq!(back.column(2), &[0.0, 0.0, 0.0]);
        assert_eq!(back.column(3), &[3.0, 4.0, 5.0]);
    }
}
