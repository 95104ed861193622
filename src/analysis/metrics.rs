use serde::Serialize;

use crate::analysis::series;
use crate::data::window::Mask;
use crate::error::{AnalysisError, AnalysisResult};

/// Guard added to the fuel weight when forming O/F.
pub const OF_EPSILON: f64 = 1e-6;

/// Burn-window scalars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BurnMetrics {
    /// Last minus first windowed time, s.
    pub burn_time: f64,
    /// Trapezoidal thrust integral, lbf·s.
    pub total_impulse: f64,
    /// Impulse over burn time, lbf; 0 for a zero-length window.
    pub average_thrust: f64,
}

impl BurnMetrics {
    /// Label → formatted value, in display order.
    pub fn display_rows(&self) -> Vec<(String, String)> {
        vec![
            ("Burn Time (s)".to_string(), format_value(self.burn_time, 3)),
            (
                "Total Impulse (lbf·s)".to_string(),
                format_value(self.total_impulse, 2),
            ),
            (
                "Average Thrust (lbf)".to_string(),
                format_value(self.average_thrust, 2),
            ),
        ]
    }
}

/// Burn time, impulse and average thrust over the windowed rows.
pub fn burn_metrics(mask: &Mask, time: &[f64], thrust: &[f64]) -> AnalysisResult<BurnMetrics> {
    if mask.len() != time.len() || time.len() != thrust.len() {
        return Err(AnalysisError::invalid(format!(
            "window covers {} rows but time has {} and thrust {}",
            mask.len(),
            time.len(),
            thrust.len()
        )));
    }

    let t = mask.select(time);
    let f = mask.select(thrust);
    let (Some(&first), Some(&last)) = (t.first(), t.last()) else {
        return Err(AnalysisError::insufficient("no samples in the burn window"));
    };

    let burn_time = last - first;
    let total_impulse = series::trapz(&f, &t);
    let average_thrust = if burn_time > 0.0 {
        total_impulse / burn_time
    } else {
        0.0
    };

    Ok(BurnMetrics {
        burn_time,
        total_impulse,
        average_thrust,
    })
}

/// Oxidizer-to-fuel ratio per row over the full series.
pub fn of_ratio(fuel: &[f64], oxidizer: &[f64]) -> Vec<f64> {
    oxidizer
        .iter()
        .zip(fuel.iter())
        .map(|(&ox, &fu)| ox / (fu + OF_EPSILON))
        .collect()
}

/// Fixed-decimal rendering with `--` for missing values.
pub fn format_value(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "--".to_string()
    } else {
        format!("{value:.decimals$}")
    }
}

/// Unit in a trailing parenthesised suffix, e.g. `Thrust (lbf)` → `lbf`.
pub fn extract_unit(name: &str) -> Option<&str> {
    let open = name.find('(')?;
    let close = name[open + 1..].find(')')? + open + 1;
    let unit = name[open + 1..close].trim();
    (!unit.is_empty()).then_some(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_over_window() {
        let mask = Mask::from_vec(vec![false, true, true, true, false]);
        let time = [0.0, 1.0, 2.0, 3.0, 4.0];
        let thrust = [0.0, 100.0, 100.0, 100.0, 0.0];
        let m = burn_metrics(&mask, &time, &thrust).unwrap();
        assert_eq!(m.burn_time, 2.0);
        assert_eq!(m.total_impulse, 200.0);
        assert_eq!(m.average_thrust, 100.0);
    }

    #[test]
    fn single_point_window_has_zero_average() {
        let mask = Mask::from_vec(vec![false, true, false]);
        let m = burn_metrics(&mask, &[0.0, 1.0, 2.0], &[5.0, 6.0, 7.0]).unwrap();
        assert_eq!(m.burn_time, 0.0);
        assert_eq!(m.total_impulse, 0.0);
        assert_eq!(m.average_thrust, 0.0);
    }

    #[test]
    fn empty_or_misaligned_window_is_rejected() {
        let empty = Mask::from_vec(vec![false, false]);
        assert!(burn_metrics(&empty, &[0.0, 1.0], &[1.0, 1.0]).is_err());
        let short = Mask::all(3);
        assert!(burn_metrics(&short, &[0.0, 1.0], &[1.0, 1.0]).is_err());
    }

    #[test]
    fn of_ratio_guards_zero_fuel() {
        let r = of_ratio(&[2.0, 0.0], &[5.0, 1.0]);
        assert!((r[0] - 2.5).abs() < 1e-5);
        assert!((r[1] - 1e6).abs() < 1e-3);
    }

    #[test]
    fn formatting_and_units() {
        assert_eq!(format_value(1.23456, 3), "1.235");
        assert_eq!(format_value(f64::NAN, 2), "--");
        assert_eq!(extract_unit("Thrust (lbf)"), Some("lbf"));
        assert_eq!(extract_unit("Load Cell 1"), None);
        assert_eq!(extract_unit("odd ()"), None);
    }

    #[test]
    fn display_rows_are_labelled() {
        let rows = BurnMetrics {
            burn_time: 2.0,
            total_impulse: 200.0,
            average_thrust: 100.0,
        }
        .display_rows();
        assert_eq!(rows[0], ("Burn Time (s)".to_string(), "2.000".to_string()));
        assert_eq!(rows[2].1, "100.00");
    }
}
