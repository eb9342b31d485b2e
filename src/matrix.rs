//! Column-major sample × channel matrix.
//!
//! [`TimeSeries`] stores a multi-channel recording in a flat `Vec<f64>` with
//! column-major layout, so each channel's samples are contiguous. Rows are
//! ordered samples (time, frequency bins or within-cycle phase once the data
//! has been transformed) and columns are channels.

/// Column-major matrix of samples (rows) × channels (columns).
///
/// Element `(row, col)` lives at index `row + col * nrows`.
///
/// # Examples
///
/// ```
/// use fluctus_core::matrix::TimeSeries;
///
/// // 3 samples, 2 channels
/// let ts = TimeSeries::from_column_major(vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0], 3, 2).unwrap();
/// assert_eq!(ts[(1, 1)], 20.0);
/// assert_eq!(ts.column(0), &[1.0, 2.0, 3.0]);
/// assert_eq!(ts.row(2), vec![3.0, 30.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    data: Vec<f64>,
    nrows: usize,
    ncols: usize,
}

impl TimeSeries {
    /// Create from flat column-major data.
    ///
    /// Returns `None` if `data.len() != nrows * ncols`.
    pub fn from_column_major(data: Vec<f64>, nrows: usize, ncols: usize) -> Option<Self> {
        if data.len() != nrows * ncols {
            return None;
        }
        Some(Self { data, nrows, ncols })
    }

    /// Create from one vector per channel.
    ///
    /// Returns `None` if the channels differ in length.
    pub fn from_columns(columns: &[Vec<f64>]) -> Option<Self> {
        let nrows = columns.first().map_or(0, Vec::len);
        if columns.iter().any(|c| c.len() != nrows) {
            return None;
        }
        let data = columns.iter().flatten().copied().collect();
        Some(Self {
            data,
            nrows,
            ncols: columns.len(),
        })
    }

    /// Create from one vector per sample (row-major input, as most readers produce).
    ///
    /// Returns `None` if the rows differ in length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != ncols) {
            return None;
        }
        let mut data = vec![0.0; nrows * ncols];
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                data[i + j * nrows] = v;
            }
        }
        Some(Self { data, nrows, ncols })
    }

    /// Single-channel series.
    pub fn from_channel(values: Vec<f64>) -> Self {
        let nrows = values.len();
        Self {
            data: values,
            nrows,
            ncols: 1,
        }
    }

    /// Create a zero-filled matrix.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            data: vec![0.0; nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// Number of samples.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of channels.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Dimensions as `(nrows, ncols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Contiguous slice holding one channel.
    ///
    /// # Panics
    /// Panics if `col >= ncols`.
    #[inline]
    pub fn column(&self, col: usize) -> &[f64] {
        let start = col * self.nrows;
        &self.data[start..start + self.nrows]
    }

    /// Mutable contiguous slice holding one channel.
    ///
    /// # Panics
    /// Panics if `col >= ncols`.
    #[inline]
    pub fn column_mut(&mut self, col: usize) -> &mut [f64] {
        let start = col * self.nrows;
        &mut self.data[start..start + self.nrows]
    }

    /// Iterate over channels as slices.
    pub fn columns(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.ncols).map(move |j| self.column(j))
    }

    /// Extract a single sample across all channels.
    ///
    /// O(ncols): rows are strided in column-major layout.
    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.ncols)
            .map(|j| self.data[row + j * self.nrows])
            .collect()
    }

    /// Copy of rows `start..end`, clipped to the matrix.
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.nrows);
        let start = start.min(end);
        let data = self
            .columns()
            .flat_map(|c| c[start..end].iter().copied())
            .collect();
        Self {
            data,
            nrows: end - start,
            ncols: self.ncols,
        }
    }

    /// New matrix holding the listed channels, in the listed order.
    ///
    /// # Panics
    /// Panics if any index is `>= ncols`.
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        let data = indices
            .iter()
            .flat_map(|&j| self.column(j).iter().copied())
            .collect();
        Self {
            data,
            nrows: self.nrows,
            ncols: indices.len(),
        }
    }

    /// Mean of each channel.
    pub fn column_means(&self) -> Vec<f64> {
        self.columns()
            .map(|c| c.iter().sum::<f64>() / c.len() as f64)
            .collect()
    }

    /// Mean across channels for each sample.
    pub fn row_means(&self) -> Vec<f64> {
        let mut means = vec![0.0; self.nrows];
        for col in self.columns() {
            for (m, &v) in means.iter_mut().zip(col) {
                *m += v;
            }
        }
        for m in means.iter_mut() {
            *m /= self.ncols as f64;
        }
        means
    }

    /// Flat slice of the underlying column-major data.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Drop singleton dimensions: a single channel or a single sample is
    /// returned as a plain vector, anything else as the flat column-major data.
    pub fn squeeze(&self) -> Vec<f64> {
        match (self.nrows, self.ncols) {
            (1, _) => self.row(0),
            (_, 1) => self.column(0).to_vec(),
            _ => self.data.clone(),
        }
    }
}

impl std::ops::Index<(usize, usize)> for TimeSeries {
    type Output = f64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        debug_assert!(
            row < self.nrows && col < self.ncols,
            "TimeSeries index ({}, {}) out of bounds for {}x{} matrix",
            row,
            col,
            self.nrows,
            self.ncols
        );
        &self.data[row + col * self.nrows]
    }
}

impl std::ops::IndexMut<(usize, usize)> for TimeSeries {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        debug_assert!(
            row < self.nrows && col < self.ncols,
            "TimeSeries index ({}, {}) out of bounds for {}x{} matrix",
            row,
            col,
            self.nrows,
            self.ncols
        );
        &mut self.data[row + col * self.nrows]
    }
}

impl std::fmt::Display for TimeSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TimeSeries({} samples x {} channels)",
            self.nrows, self.ncols
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_4x2() -> TimeSeries {
        TimeSeries::from_column_major(vec![1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0], 4, 2)
            .unwrap()
    }

    #[test]
    fn test_from_column_major_invalid() {
        assert!(TimeSeries::from_column_major(vec![1.0, 2.0], 3, 1).is_none());
    }

    #[test]
    fn test_from_rows_matches_column_major() {
        let rows = vec![
            vec![1.0, 10.0],
            vec![2.0, 20.0],
            vec![3.0, 30.0],
            vec![4.0, 40.0],
        ];
        assert_eq!(TimeSeries::from_rows(&rows).unwrap(), sample_4x2());
        assert!(TimeSeries::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_none());
    }

    #[test]
    fn test_from_columns_ragged() {
        assert!(TimeSeries::from_columns(&[vec![1.0, 2.0], vec![3.0]]).is_none());
    }

    #[test]
    fn test_slice_rows_clips() {
        let ts = sample_4x2();
        let head = ts.slice_rows(0, 2);
        assert_eq!(head.shape(), (2, 2));
        assert_eq!(head.column(1), &[10.0, 20.0]);

        let mid = ts.slice_rows(1, 10);
        assert_eq!(mid.shape(), (3, 2));
        assert_eq!(mid.column(0), &[2.0, 3.0, 4.0]);

        assert_eq!(ts.slice_rows(3, 1).nrows(), 0);
    }

    #[test]
    fn test_select_columns_reorders() {
        let ts = sample_4x2();
        let sel = ts.select_columns(&[1, 0, 1]);
        assert_eq!(sel.ncols(), 3);
        assert_eq!(sel.column(0), ts.column(1));
        assert_eq!(sel.column(1), ts.column(0));
    }

    #[test]
    fn test_means() {
        let ts = sample_4x2();
        assert_eq!(ts.column_means(), vec![2.5, 25.0]);
        assert_eq!(ts.row_means(), vec![5.5, 11.0, 16.5, 22.0]);
    }

    #[test]
    fn test_squeeze() {
        let single = TimeSeries::from_channel(vec![1.0, 2.0, 3.0]);
        assert_eq!(single.squeeze(), vec![1.0, 2.0, 3.0]);
        let one_row = TimeSeries::from_rows(&[vec![5.0, 6.0]]).unwrap();
        assert_eq!(one_row.squeeze(), vec![5.0, 6.0]);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            format!("{}", sample_4x2()),
            "TimeSeries(4 samples x 2 channels)"
        );
    }
}
