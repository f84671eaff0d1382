//! Descriptive statistics used by the heuristics.
//!
//! Conventions follow tabular-analysis defaults: the standard deviation is
//! the sample one (n - 1 denominator) and quantiles interpolate linearly
//! between closest ranks. A standard deviation over fewer than two values is
//! zero, never NaN, so thresholds derived from it stay usable.

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation, zero for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Quantile `q` in [0, 1] of an ascending-sorted slice, linear interpolation.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Column-wise mean of fixed-width rows. Zeros for no rows.
pub fn column_mean<const N: usize>(rows: &[[f64; N]]) -> [f64; N] {
    let mut out = [0.0; N];
    if rows.is_empty() {
        return out;
    }
    for row in rows {
        for (acc, v) in out.iter_mut().zip(row) {
            *acc += v;
        }
    }
    for acc in out.iter_mut() {
        *acc /= rows.len() as f64;
    }
    out
}

/// Column-wise sample standard deviation of fixed-width rows.
pub fn column_std<const N: usize>(rows: &[[f64; N]]) -> [f64; N] {
    let mut out = [0.0; N];
    for (col, slot) in out.iter_mut().enumerate() {
        let values: Vec<f64> = rows.iter().map(|r| r[col]).collect();
        *slot = sample_std(&values);
    }
    out
}

/// L1 distance between two rows.
pub fn l1_distance<const N: usize>(a: &[f64; N], b: &[f64; N]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

/// Position of the row L1-closest to `target`; ties go to the earliest row.
pub fn l1_argmin<const N: usize>(rows: &[[f64; N]], target: &[f64; N]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, row) in rows.iter().enumerate() {
        let d = l1_distance(row, target);
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(sample_std(&[5.0]), 0.0);
        assert_eq!(sample_std(&[]), 0.0);
        // Sample std of 1..=4 is sqrt(5/3)
        let s = sample_std(&[1.0, 2.0, 3.0, 4.0]);
        assert!((s - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_linear() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile_sorted(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&sorted, 0.25), Some(1.75));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_column_stats() {
        let rows = [[0.0, 10.0], [2.0, 10.0]];
        assert_eq!(column_mean(&rows), [1.0, 10.0]);
        let std = column_std(&rows);
        assert!((std[0] - 2.0f64.sqrt()).abs() < 1e-12);
        assert_eq!(std[1], 0.0);
        assert_eq!(column_std(&rows[..1]), [0.0, 0.0]);
    }

    #[test]
    fn test_l1_argmin_prefers_first_on_tie() {
        let rows = [[1.0, 0.0], [0.0, 1.0], [5.0, 5.0]];
        assert_eq!(l1_argmin(&rows, &[0.0, 0.0]), Some(0));
        assert_eq!(l1_argmin(&rows, &[5.0, 4.0]), Some(2));
        assert_eq!(l1_argmin::<2>(&[], &[0.0, 0.0]), None);
    }
}
