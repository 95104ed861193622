use std::fmt;

use crate::data::model::ColumnTable;
use crate::error::{AnalysisError, AnalysisResult};

/// Which table columns play which role in the analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnBindings {
    pub time: Option<String>,
    /// Thrust channels, summed into total thrust. Unique, selection order.
    pub thrust: Vec<String>,
    pub chamber_pressure: Option<String>,
    pub fuel_weight: Option<String>,
    pub oxidizer_weight: Option<String>,
}

impl ColumnBindings {
    /// Guess roles from column names.
    pub fn infer(columns: &[String]) -> Self {
        let mut b = ColumnBindings::default();
        for col in columns {
            let lower = col.to_lowercase();

            if b.time.is_none() && (lower == "t" || lower.contains("time")) {
                b.time = Some(col.clone());
            }
            if lower.contains("thrust") {
                b.thrust.push(col.clone());
            }
            if b.chamber_pressure.is_none() && lower.contains("chamber") && lower.contains("press")
            {
                b.chamber_pressure = Some(col.clone());
            }
            if b.fuel_weight.is_none() && lower.contains("fuel") && lower.contains("weight") {
                b.fuel_weight = Some(col.clone());
            }
            if b.oxidizer_weight.is_none() && lower.contains("ox") && lower.contains("weight") {
                b.oxidizer_weight = Some(col.clone());
            }
        }
        b
    }

    /// Time and at least one thrust channel are bound.
    pub fn is_hotfire_ready(&self) -> bool {
        self.time.is_some() && !self.thrust.is_empty()
    }

    /// Add or remove a thrust channel.
    pub fn toggle_thrust(&mut self, column: &str) {
        if let Some(pos) = self.thrust.iter().position(|c| c == column) {
            self.thrust.remove(pos);
        } else {
            self.thrust.push(column.to_string());
        }
    }

    /// Every bound column must exist in `table`.
    pub fn validate(&self, table: &ColumnTable) -> AnalysisResult<()> {
        let named = self
            .time
            .iter()
            .chain(self.thrust.iter())
            .chain(self.chamber_pressure.iter())
            .chain(self.fuel_weight.iter())
            .chain(self.oxidizer_weight.iter());
        for col in named {
            if !table.has_column(col) {
                return Err(AnalysisError::invalid(format!("no column named '{col}'")));
            }
        }
        Ok(())
    }

    /// Generated sources available under these bindings.
    pub fn generated_sources(&self) -> Vec<SeriesSource> {
        let mut out = Vec::new();
        if !self.thrust.is_empty() {
            out.push(SeriesSource::TotalThrust);
        }
        if self.chamber_pressure.is_some() {
            out.push(SeriesSource::ChamberPressure);
        }
        if self.fuel_weight.is_some() && self.oxidizer_weight.is_some() {
            out.push(SeriesSource::OfRatio);
        }
        out
    }
}

/// Column-name hints for the cold-flow (CdA) workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColdFlowHints {
    pub feed_pressure: Option<String>,
    pub tank_weight: Option<String>,
}

impl ColdFlowHints {
    pub fn infer(columns: &[String]) -> Self {
        ColdFlowHints {
            feed_pressure: first_matching(columns, |l| l.contains("press")),
            tank_weight: first_matching(columns, |l| l.contains("weight") || l.contains("mass")),
        }
    }
}

fn first_matching(columns: &[String], pred: impl Fn(&str) -> bool) -> Option<String> {
    columns
        .iter()
        .find(|c| pred(c.to_lowercase().as_str()))
        .cloned()
}

/// A plottable series, resolved once at selection time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeriesSource {
    /// A table column as-is.
    Raw(String),
    /// Sum of the bound thrust channels.
    TotalThrust,
    /// Oxidizer weight / fuel weight.
    OfRatio,
    /// The bound chamber-pressure column.
    ChamberPressure,
}

impl SeriesSource {
    /// Display unit, taken from a `(...)` column suffix for raw columns.
    pub fn unit(&self) -> Option<String> {
        match self {
            SeriesSource::Raw(name) => {
                crate::analysis::metrics::extract_unit(name).map(str::to_string)
            }
            SeriesSource::TotalThrust => Some("lbf".to_string()),
            SeriesSource::ChamberPressure => Some("psi".to_string()),
            SeriesSource::OfRatio => Some("ratio".to_string()),
        }
    }
}

impl fmt::Display for SeriesSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesSource::Raw(name) => write!(f, "{name}"),
            SeriesSource::TotalThrust => write!(f, "Total Thrust (lbf)"),
            SeriesSource::OfRatio => write!(f, "O/F Ratio"),
            SeriesSource::ChamberPressure => write!(f, "Chamber Pressure (psi)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn infer_matches_common_names() {
        let b = ColumnBindings::infer(&cols(&[
            "Time (s)",
            "Thrust LC1 (lbf)",
            "Thrust LC2 (lbf)",
            "Chamber Pressure (psi)",
            "Fuel Weight (lbs)",
            "Ox Weight (lbs)",
            "Elapsed time",
        ]));
        assert_eq!(b.time.as_deref(), Some("Time (s)"));
        assert_eq!(b.thrust.len(), 2);
        assert_eq!(b.chamber_pressure.as_deref(), Some("Chamber Pressure (psi)"));
        assert_eq!(b.fuel_weight.as_deref(), Some("Fuel Weight (lbs)"));
        assert_eq!(b.oxidizer_weight.as_deref(), Some("Ox Weight (lbs)"));
        assert!(b.is_hotfire_ready());
        assert_eq!(b.generated_sources().len(), 3);
    }

    #[test]
    fn single_letter_time_column() {
        let b = ColumnBindings::infer(&cols(&["t", "load"]));
        assert_eq!(b.time.as_deref(), Some("t"));
        assert!(!b.is_hotfire_ready());
    }

    #[test]
    fn toggle_thrust_adds_and_removes() {
        let mut b = ColumnBindings::default();
        b.toggle_thrust("a");
        b.toggle_thrust("b");
        b.toggle_thrust("a");
        assert_eq!(b.thrust, vec!["b".to_string()]);
    }

    #[test]
    fn cold_flow_hints() {
        let h = ColdFlowHints::infer(&cols(&["Time", "Feed Press (psi)", "Tank Mass (lbs)"]));
        assert_eq!(h.feed_pressure.as_deref(), Some("Feed Press (psi)"));
        assert_eq!(h.tank_weight.as_deref(), Some("Tank Mass (lbs)"));
    }

    #[test]
    fn source_units() {
        assert_eq!(SeriesSource::Raw("P1 (psi)".into()).unit().as_deref(), Some("psi"));
        assert_eq!(SeriesSource::OfRatio.to_string(), "O/F Ratio");
    }
}
