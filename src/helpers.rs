//! Small numeric helpers shared across the transforms.

/// Arithmetic mean. `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mu = mean(values);
    let var = values.iter().map(|&x| (x - mu).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Percentile with linear interpolation between order statistics.
///
/// `p` is in `[0, 100]`. `NaN` if the input is empty or contains `NaN`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(&sorted, p)
}

/// Same as [`percentile`] on already ascending data.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Index of the first maximum. A `NaN` wins over any number, so degenerate
/// inputs surface instead of being silently skipped.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            return Some(i);
        }
        match best {
            Some(b) if values[b] >= v => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Index of the first minimum, with the same `NaN` rule as [`argmax`].
pub fn argmin(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            return Some(i);
        }
        match best {
            Some(b) if values[b] <= v => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Spacing between the first two grid points, if there are two.
pub fn grid_spacing(grid: &[f64]) -> Option<f64> {
    match grid {
        [a, b, ..] => Some(b - a),
        _ => None,
    }
}

/// Uniform grid `start + k * step` for `k in 0..n`.
pub fn uniform_grid(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|k| start + k as f64 * step).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMERICAL_EPS: f64 = 1e-10;

    #[test]
    fn test_mean_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v) - 5.0).abs() < NUMERICAL_EPS);
        assert!((std_dev(&v) - 2.0).abs() < NUMERICAL_EPS);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_percentile_linear() {
        let v = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert!((percentile(&v, 50.0) - 3.0).abs() < NUMERICAL_EPS);
        assert!((percentile(&v, 0.0) - 1.0).abs() < NUMERICAL_EPS);
        assert!((percentile(&v, 100.0) - 5.0).abs() < NUMERICAL_EPS);
        // rank 0.1 * 4 = 0.4 between 1 and 2
        assert!((percentile(&v, 10.0) - 1.4).abs() < NUMERICAL_EPS);
        assert!(percentile(&[1.0, f64::NAN], 50.0).is_nan());
    }

    #[test]
    fn test_argmax_first_occurrence() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(argmin(&[2.0, 0.0, 5.0, 0.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_argmax_nan_wins() {
        assert_eq!(argmax(&[1.0, f64::NAN, 3.0]), Some(1));
    }

    #[test]
    fn test_grid_helpers() {
        let g = uniform_grid(1.0, 0.5, 4);
        assert_eq!(g, vec![1.0, 1.5, 2.0, 2.5]);
        assert_eq!(grid_spacing(&g), Some(0.5));
        assert_eq!(grid_spacing(&[1.0]), None);
    }
}
