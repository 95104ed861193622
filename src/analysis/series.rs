//! Pure operations over numeric sequences. NaN marks a missing sample.

/// Least-squares line through paired samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    /// Number of index pairs that took part in the fit.
    pub points: usize,
}

impl Regression {
    /// Both coefficients are usable numbers.
    pub fn is_valid(&self) -> bool {
        self.slope.is_finite() && self.intercept.is_finite()
    }
}

/// Keep every `factor`-th element starting at index 0. `factor <= 1` copies.
pub fn downsample<T: Copy>(series: &[T], factor: usize) -> Vec<T> {
    if factor <= 1 {
        return series.to_vec();
    }
    series.iter().step_by(factor).copied().collect()
}

/// Centered moving average over `window / 2` neighbours on each side.
///
/// NaN neighbours are skipped; the edges use the part of the window that
/// exists. A position whose whole neighbourhood is NaN keeps its own value.
pub fn smooth(series: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 {
        return series.to_vec();
    }
    let half = window / 2;
    let n = series.len();

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(n - 1);
            let (sum, count) = series[lo..=hi]
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
            if count > 0 {
                sum / count as f64
            } else {
                series[i]
            }
        })
        .collect()
}

/// Arithmetic mean of the non-NaN values.
///
/// Returns 0 when there is nothing to average. That zero is a display default,
/// not a statistic; callers that need a real mean must check for valid samples
/// first.
pub fn mean(series: &[f64]) -> f64 {
    let (sum, count) = series
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Mean of `series[a..=b]`, with the indices taken in either order and clipped
/// to the series.
pub fn mean_between(series: &[f64], a: usize, b: usize) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let last = series.len() - 1;
    let lo = a.min(b).min(last);
    let hi = a.max(b).min(last);
    mean(&series[lo..=hi])
}

/// Trapezoidal integral of `y` over `x`. Signed: descending `x` integrates
/// negative.
pub fn trapz(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yw, xw)| (yw[1] + yw[0]) * (xw[1] - xw[0]) / 2.0)
        .sum()
}

/// Ordinary least squares over the index pairs where neither value is NaN.
///
/// Fewer than two pairs or all x equal yields NaN coefficients. Sums are
/// taken about the mean of x so epoch-scale timestamps keep their precision.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Regression {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(xi, yi)| !xi.is_nan() && !yi.is_nan())
        .map(|(&xi, &yi)| (xi, yi))
        .collect();
    let n = pairs.len();

    let (lo, hi) = pairs
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(xi, _)| {
            (lo.min(xi), hi.max(xi))
        });
    if n < 2 || lo == hi {
        return Regression {
            slope: f64::NAN,
            intercept: f64::NAN,
            points: n,
        };
    }

    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;
    let (mut sxx, mut sxy) = (0.0, 0.0);
    for &(xi, yi) in &pairs {
        let dx = xi - mean_x;
        sxx += dx * dx;
        sxy += dx * (yi - mean_y);
    }

    let slope = sxy / sxx;
    Regression {
        slope,
        intercept: mean_y - slope * mean_x,
        points: n,
    }
}

/// Row-wise sum of several aligned series, treating NaN as 0.
pub fn sum_ignoring_nan(channels: &[Vec<f64>]) -> Vec<f64> {
    let len = channels.iter().map(Vec::len).max().unwrap_or(0);
    (0..len)
        .map(|i| {
            channels
                .iter()
                .filter_map(|c| c.get(i).copied())
                .filter(|v| !v.is_nan())
                .sum()
        })
        .collect()
}

/// Largest non-NaN value.
pub fn max(series: &[f64]) -> Option<f64> {
    series
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn downsample_is_identity_for_small_factors() {
        let s = [1.0, 2.0, 3.0];
        assert_eq!(downsample(&s, 0), s.to_vec());
        assert_eq!(downsample(&s, 1), s.to_vec());
        assert_eq!(downsample(&[0, 1, 2, 3, 4, 5, 6], 3), vec![0, 3, 6]);
    }

    #[test]
    fn smooth_small_window_is_copy() {
        let s = [1.0, f64::NAN, 5.0];
        let out = smooth(&s, 1);
        assert_eq!(out[0], 1.0);
        assert!(out[1].is_nan());
        assert_eq!(out[2], 5.0);
    }

    #[test]
    fn smooth_keeps_constant_series() {
        let s = vec![4.2; 17];
        for w in [2, 3, 5, 10, 40] {
            assert!(smooth(&s, w).iter().all(|&v| close(v, 4.2)), "w={w}");
        }
    }

    #[test]
    fn smooth_clips_edges_and_skips_nan() {
        let out = smooth(&[1.0, 2.0, f64::NAN, 6.0], 3);
        assert!(close(out[0], 1.5));
        assert!(close(out[1], 1.5));
        assert!(close(out[2], 4.0));
        assert!(close(out[3], 6.0));

        let all_nan = smooth(&[f64::NAN, f64::NAN], 5);
        assert!(all_nan.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn mean_defaults_to_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[f64::NAN, f64::NAN]), 0.0);
        assert!(close(mean(&[1.0, f64::NAN, 3.0]), 2.0));
    }

    #[test]
    fn mean_between_accepts_either_order() {
        let s = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(close(mean_between(&s, 3, 1), 3.0));
        assert!(close(mean_between(&s, 4, 40), 5.0));
        assert_eq!(mean_between(&[], 0, 3), 0.0);
    }

    #[test]
    fn trapz_properties() {
        let x = [0.0, 0.5, 2.0, 2.25];
        assert_eq!(trapz(&[0.0; 4], &x), 0.0);

        let y = [1.0, 3.0, 2.0, 4.0];
        let forward = trapz(&y, &x);
        let mut yr = y;
        let mut xr = x;
        yr.reverse();
        xr.reverse();
        assert!(close(trapz(&yr, &xr), -forward));
        assert!(close(forward, 1.0 + 3.75 + 0.75));
    }

    #[test]
    fn regression_recovers_exact_line() {
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 2.0).collect();
        let fit = linear_regression(&x, &y);
        assert!(close(fit.slope, 3.0));
        assert!(close(fit.intercept, 2.0));
        assert_eq!(fit.points, 10);
    }

    #[test]
    fn regression_drops_nan_pairs_and_rejects_degenerate_input() {
        let fit = linear_regression(&[0.0, f64::NAN, 1.0, 2.0], &[1.0, 9.0, f64::NAN, 5.0]);
        assert_eq!(fit.points, 2);
        assert!(close(fit.slope, 2.0));
        assert!(close(fit.intercept, 1.0));

        assert!(!linear_regression(&[1.0], &[1.0]).is_valid());
        assert!(!linear_regression(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_valid());
        assert!(!linear_regression(&[], &[]).is_valid());
    }

    #[test]
    fn regression_handles_epoch_scale_time() {
        let x: Vec<f64> = (0..31).map(|i| 1.7e9 + 0.1 * i as f64).collect();
        let y: Vec<f64> = (0..31).map(|i| 40.0 - 0.12 * i as f64).collect();
        let fit = linear_regression(&x, &y);
        assert!(fit.is_valid());
        assert_eq!(fit.points, 31);
        assert!((fit.slope + 1.2).abs() < 1e-4, "{}", fit.slope);
    }

    #[test]
    fn channel_sum_ignores_nan() {
        let total = sum_ignoring_nan(&[vec![1.0, f64::NAN], vec![2.0, f64::NAN]]);
        assert_eq!(total, vec![3.0, 0.0]);
        assert_eq!(max(&[1.0, f64::NAN, 7.0]), Some(7.0));
        assert_eq!(max(&[f64::NAN]), None);
    }
}
