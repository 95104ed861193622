//! Boundary to whatever displays results and collects scalar inputs.
//!
//! The engine only pushes data out through [`Presentation`] and pulls single
//! values in through [`ValuePrompt`]; it never reads back from either.

use std::fmt;
use std::io::Write;

use anyhow::{Context, Result};

/// Notification class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Warning,
    Info,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = match self {
            NoticeLevel::Success => "✓",
            NoticeLevel::Error => "✗",
            NoticeLevel::Warning => "⚠",
            NoticeLevel::Info => "ℹ",
        };
        write!(f, "{icon}")
    }
}

/// One named y series drawn against the plot's x values.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesLine {
    pub name: String,
    pub unit: Option<String>,
    pub y: Vec<f64>,
}

/// Horizontal reference line.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceLine {
    pub label: String,
    pub value: f64,
}

/// A chart request: shared x axis, one or more y series, axis labels.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotData {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<f64>,
    pub lines: Vec<SeriesLine>,
    pub references: Vec<ReferenceLine>,
}

impl PlotData {
    /// Single-series plot.
    pub fn single(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
        x: Vec<f64>,
        y: Vec<f64>,
    ) -> Self {
        let title = title.into();
        let y_label = y_label.into();
        let unit = crate::analysis::metrics::extract_unit(&y_label).map(str::to_string);
        PlotData {
            lines: vec![SeriesLine {
                name: title.clone(),
                unit,
                y,
            }],
            title,
            x_label: x_label.into(),
            y_label,
            x,
            references: Vec::new(),
        }
    }

    pub fn with_reference(mut self, label: impl Into<String>, value: f64) -> Self {
        self.references.push(ReferenceLine {
            label: label.into(),
            value,
        });
        self
    }

    /// Drop x positions where x or every y series is NaN.
    pub fn without_gaps(mut self) -> Self {
        let keep: Vec<bool> = (0..self.x.len())
            .map(|i| {
                !self.x[i].is_nan()
                    && self
                        .lines
                        .iter()
                        .any(|l| l.y.get(i).is_some_and(|v| !v.is_nan()))
            })
            .collect();
        let filter = |v: &[f64]| -> Vec<f64> {
            v.iter()
                .zip(keep.iter())
                .filter(|(_, &k)| k)
                .map(|(&x, _)| x)
                .collect()
        };
        self.x = filter(&self.x);
        for line in &mut self.lines {
            line.y = filter(&line.y);
        }
        self
    }

    /// Write x and every series as CSV columns, headed by their labels.
    pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        let mut header = vec![self.x_label.clone()];
        header.extend(self.lines.iter().map(|l| match &l.unit {
            Some(unit) if !l.name.contains('(') => format!("{} ({unit})", l.name),
            _ => l.name.clone(),
        }));
        writer.write_record(&header)?;

        for (i, x) in self.x.iter().enumerate() {
            let mut record = vec![x.to_string()];
            record.extend(self.lines.iter().map(|l| match l.y.get(i) {
                Some(v) if !v.is_nan() => v.to_string(),
                _ => String::new(),
            }));
            writer.write_record(&record)?;
        }
        writer.flush().context("Failed to write plot CSV")?;
        Ok(())
    }
}

/// Display side of the engine.
pub trait Presentation {
    /// Show a chart.
    fn show_plot(&mut self, plot: PlotData);

    /// Show metric name → formatted value pairs, in order.
    fn show_metrics(&mut self, metrics: &[(String, String)]);

    /// Toast-style message.
    fn notify(&mut self, level: NoticeLevel, message: &str);
}

/// Source of single scalar inputs. `None` means the user cancelled.
pub trait ValuePrompt {
    fn request(&mut self, title: &str, message: &str) -> Option<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_plot_takes_unit_from_label() {
        let p = PlotData::single("Thrust vs Time", "Time (s)", "Thrust (lbf)", vec![0.0], vec![1.0]);
        assert_eq!(p.lines[0].unit.as_deref(), Some("lbf"));
        assert_eq!(p.lines[0].name, "Thrust vs Time");
    }

    #[test]
    fn gaps_are_removed_across_all_lines() {
        let p = PlotData::single(
            "t",
            "x",
            "y",
            vec![0.0, f64::NAN, 2.0, 3.0],
            vec![1.0, 2.0, f64::NAN, 4.0],
        )
        .without_gaps();
        assert_eq!(p.x, vec![0.0, 3.0]);
        assert_eq!(p.lines[0].y, vec![1.0, 4.0]);
    }

    #[test]
    fn csv_export_has_header_and_blank_gaps() {
        let p = PlotData::single(
            "ISP vs Time",
            "Time (s)",
            "ISP (s)",
            vec![0.0, 0.5],
            vec![210.5, f64::NAN],
        );
        let mut buf = Vec::new();
        p.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "Time (s),ISP vs Time (s)\n0,210.5\n0.5,\n");
    }
}
