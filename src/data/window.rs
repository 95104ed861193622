use crate::error::{AnalysisError, AnalysisResult};

// ---------------------------------------------------------------------------
// Mask: which rows take part in the analysis window
// ---------------------------------------------------------------------------

/// Boolean inclusion vector over row indices, aligned with the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask(Vec<bool>);

/// How the primary window is built. The two modes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowMode {
    /// Keep rows whose total thrust lies in `[0.5 T, 1.5 T]`.
    Threshold { target: f64 },
    /// Keep rows whose time lies in `[start, end]`.
    TimeRange { start: f64, end: f64 },
}

impl Mask {
    /// Include every row.
    pub fn all(len: usize) -> Self {
        Mask(vec![true; len])
    }

    pub fn from_vec(bits: Vec<bool>) -> Self {
        Mask(bits)
    }

    /// Rows whose thrust is within 50 %..150 % of `target`. NaN never matches.
    pub fn from_threshold(thrust: &[f64], target: f64) -> Self {
        let (lower, upper) = threshold_bounds(target);
        Mask(thrust.iter().map(|&t| t >= lower && t <= upper).collect())
    }

    /// Rows whose time lies within `[start, end]` inclusive.
    pub fn from_time_range(time: &[f64], start: f64, end: f64) -> Self {
        Mask(time.iter().map(|&t| t >= start && t <= end).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of included rows.
    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    pub fn any(&self) -> bool {
        self.0.iter().any(|&b| b)
    }

    pub fn first_included(&self) -> Option<usize> {
        self.0.iter().position(|&b| b)
    }

    pub fn last_included(&self) -> Option<usize> {
        self.0.iter().rposition(|&b| b)
    }

    /// Indices of included rows in order.
    pub fn indices(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, &b)| b)
            .map(|(i, _)| i)
            .collect()
    }

    /// Values of `series` at included rows, order preserved.
    pub fn select(&self, series: &[f64]) -> Vec<f64> {
        series
            .iter()
            .zip(self.0.iter())
            .filter(|(_, &keep)| keep)
            .map(|(&v, _)| v)
            .collect()
    }

    /// Add a margin of `percent` % of the row count on both sides of the
    /// included run.
    ///
    /// At least one row is added per side; rows are only ever switched on. A
    /// mask with no included row is returned unchanged.
    pub fn expanded(&self, percent: f64) -> Mask {
        let mut out = self.clone();
        let (Some(first), Some(last)) = (self.first_included(), self.last_included()) else {
            return out;
        };

        let n = self.len();
        let extra = ((n as f64 * percent / 100.0).floor() as usize).max(1);
        let start = first.saturating_sub(extra);
        let end = (last + extra).min(n - 1);
        for bit in &mut out.0[start..=end] {
            *bit = true;
        }
        out
    }

    /// True when every row included here is also included in `other`.
    pub fn is_subset_of(&self, other: &Mask) -> bool {
        self.len() == other.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(&a, &b)| !a || b)
    }
}

/// Lower and upper acceptance bounds for a target thrust.
pub fn threshold_bounds(target: f64) -> (f64, f64) {
    (0.5 * target, 1.5 * target)
}

/// Build the primary mask for a window mode.
///
/// Returns `DegenerateWindow` when a threshold selects no rows; the caller is
/// expected to fall back to [`Mask::all`].
pub fn build_window(mode: WindowMode, time: &[f64], thrust: &[f64]) -> AnalysisResult<Mask> {
    match mode {
        WindowMode::Threshold { target } => {
            if !target.is_finite() {
                return Err(AnalysisError::invalid("target thrust must be a number"));
            }
            let mask = Mask::from_threshold(thrust, target);
            log::debug!("threshold window T={target}: {} rows", mask.count());
            if !mask.any() {
                return Err(AnalysisError::DegenerateWindow(format!(
                    "no samples within 50-150% of {target}"
                )));
            }
            Ok(mask)
        }
        WindowMode::TimeRange { start, end } => {
            if !start.is_finite() || !end.is_finite() {
                return Err(AnalysisError::invalid("invalid custom splice time range"));
            }
            if start > end {
                return Err(AnalysisError::invalid(format!(
                    "start time {start} is after end time {end}"
                )));
            }
            let mask = Mask::from_time_range(time, start, end);
            log::debug!("time window [{start}, {end}]: {} rows", mask.count());
            if !mask.any() {
                return Err(AnalysisError::DegenerateWindow(format!(
                    "no samples between {start} s and {end} s"
                )));
            }
            Ok(mask)
        }
    }
}

/// Parse a user-entered window bound.
pub fn parse_bound(name: &str, text: &str) -> AnalysisResult<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AnalysisError::invalid(format!("{name} '{text}' is not a number")))
}

/// Map the 0..=100 margin slider onto 0..30 % with an exponential curve,
/// rounded to 0.1 %.
pub fn margin_percent_from_slider(slider: u8) -> f64 {
    if slider == 0 {
        return 0.0;
    }
    let t = f64::from(slider.min(100)) / 100.0;
    let percent = 31f64.powf(t) - 1.0;
    (percent * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(bits: &[u8]) -> Mask {
        Mask::from_vec(bits.iter().map(|&b| b == 1).collect())
    }

    #[test]
    fn threshold_window_bounds_are_inclusive() {
        let m = Mask::from_threshold(&[40.0, 60.0, 100.0, 150.0, 160.0], 100.0);
        assert_eq!(m, mask(&[0, 1, 1, 1, 0]));
    }

    #[test]
    fn threshold_with_no_hits_is_degenerate() {
        let err = build_window(
            WindowMode::Threshold { target: 1000.0 },
            &[0.0, 1.0],
            &[1.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateWindow(_)));
    }

    #[test]
    fn time_range_rejects_bad_bounds() {
        let time = [0.0, 1.0, 2.0];
        assert!(matches!(
            build_window(WindowMode::TimeRange { start: f64::NAN, end: 1.0 }, &time, &[]),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            build_window(WindowMode::TimeRange { start: 2.0, end: 1.0 }, &time, &[]),
            Err(AnalysisError::InvalidParameter(_))
        ));
        let m = build_window(WindowMode::TimeRange { start: 0.5, end: 2.0 }, &time, &[]).unwrap();
        assert_eq!(m, mask(&[0, 1, 1]));
    }

    #[test]
    fn expansion_adds_at_least_one_row_each_side() {
        let m = mask(&[0, 0, 0, 1, 1, 0, 0, 0, 0, 0]);
        assert_eq!(m.expanded(0.0), mask(&[0, 0, 1, 1, 1, 1, 0, 0, 0, 0]));
        assert_eq!(m.expanded(20.0), mask(&[0, 1, 1, 1, 1, 1, 1, 0, 0, 0]));
    }

    #[test]
    fn expansion_clips_at_bounds_and_ignores_empty_masks() {
        let m = mask(&[1, 0, 0, 1]);
        assert_eq!(m.expanded(30.0), mask(&[1, 1, 1, 1]));
        let empty = mask(&[0, 0, 0]);
        assert_eq!(empty.expanded(10.0), empty);
    }

    #[test]
    fn expansion_is_monotonic_in_percent() {
        let m = mask(&[0, 0, 0, 0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut previous = m.clone();
        for step in 0..=300 {
            let p = f64::from(step) / 10.0;
            let grown = m.expanded(p);
            assert!(m.is_subset_of(&grown));
            assert!(previous.is_subset_of(&grown), "p={p}");
            previous = grown;
        }
    }

    #[test]
    fn select_keeps_masked_values_in_order() {
        let m = mask(&[1, 0, 1]);
        assert_eq!(m.select(&[1.0, 2.0, 3.0]), vec![1.0, 3.0]);
        assert_eq!(m.indices(), vec![0, 2]);
    }

    #[test]
    fn slider_maps_exponentially_to_thirty_percent() {
        assert_eq!(margin_percent_from_slider(0), 0.0);
        assert_eq!(margin_percent_from_slider(100), 30.0);
        let mid = margin_percent_from_slider(50);
        assert!((mid - 4.6).abs() < 1e-9, "{mid}");
    }

    #[test]
    fn bounds_parse_or_reject() {
        assert_eq!(parse_bound("start", " 1.5 "), Ok(1.5));
        assert!(parse_bound("start", "abc").is_err());
    }
}
