//! Analysis context for one loaded file.
//!
//! ```text
//!   Empty ──bind──▶ ColumnsBound ──set_window──▶ WindowSet ──metrics──▶ MetricsComputed
//!     ▲                                                                      │
//!     └──────────────── load / bind (any state) ─────────────────────────────┘
//! ```
//!
//! Physics calculators run as soon as their own inputs exist; the only chain
//! is ṁ → CdA → set pressure through the [`ResultCache`].

pub mod bindings;
pub mod results;

pub use bindings::{ColdFlowHints, ColumnBindings, SeriesSource};
pub use results::{CalcKind, CalcResult, ResultCache};

use crate::analysis::metrics::{self, BurnMetrics};
use crate::analysis::physics::{self, SetPressure};
use crate::analysis::series;
use crate::data::coerce;
use crate::data::model::ColumnTable;
use crate::data::window::{self, Mask, WindowMode};
use crate::error::{AnalysisError, AnalysisResult};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    ColumnsBound,
    WindowSet,
    MetricsComputed,
}

/// The primary analysis window.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub mode: WindowMode,
    pub primary: Mask,
    /// The mode selected nothing and `primary` is the all-rows fallback.
    pub fallback: bool,
}

/// Display filtering applied on top of the primary window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParams {
    /// Margin added around the window, % of row count.
    pub margin_percent: f64,
    /// Keep every n-th windowed row.
    pub downsample: usize,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            margin_percent: 0.0,
            downsample: 1,
        }
    }
}

/// Row selection for plotting: expanded window, then downsampled.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView {
    pub rows: Vec<usize>,
    pub time: Vec<f64>,
}

impl FilteredView {
    /// Values of a full-length series at the view's rows.
    pub fn pick(&self, full: &[f64]) -> Vec<f64> {
        self.rows
            .iter()
            .map(|&i| full.get(i).copied().unwrap_or(f64::NAN))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    table: Option<ColumnTable>,
    bindings: ColumnBindings,
    bound: bool,
    window: Option<Window>,
    last_target_thrust: Option<f64>,
    results: ResultCache,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the data and reset everything. Bindings are pre-filled with
    /// guesses but not yet confirmed.
    pub fn load(&mut self, table: ColumnTable) {
        let guessed = ColumnBindings::infer(table.columns());
        *self = Session {
            table: Some(table),
            bindings: guessed,
            ..Session::default()
        };
    }

    pub fn table(&self) -> Option<&ColumnTable> {
        self.table.as_ref()
    }

    pub fn bindings(&self) -> &ColumnBindings {
        &self.bindings
    }

    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    pub fn last_target_thrust(&self) -> Option<f64> {
        self.last_target_thrust
    }

    pub fn results(&self) -> &ResultCache {
        &self.results
    }

    pub fn phase(&self) -> Phase {
        match (&self.table, self.bound, &self.window) {
            (None, _, _) | (_, false, _) => Phase::Empty,
            (_, true, None) => Phase::ColumnsBound,
            (_, true, Some(_)) if self.results.burn().is_none() => Phase::WindowSet,
            _ => Phase::MetricsComputed,
        }
    }

    fn require_table(&self) -> AnalysisResult<&ColumnTable> {
        self.table
            .as_ref()
            .ok_or_else(|| AnalysisError::missing("please load a CSV file first"))
    }

    /// Confirm column roles. Resets window and results.
    pub fn bind(&mut self, bindings: ColumnBindings) -> AnalysisResult<()> {
        let table = self.require_table()?;
        bindings.validate(table)?;
        if bindings.time.is_none() {
            return Err(AnalysisError::missing("select a time column"));
        }
        log::info!(
            "bound time={:?} thrust={:?} chamber={:?} fuel={:?} ox={:?}",
            bindings.time,
            bindings.thrust,
            bindings.chamber_pressure,
            bindings.fuel_weight,
            bindings.oxidizer_weight
        );
        self.bindings = bindings;
        self.bound = true;
        self.window = None;
        self.last_target_thrust = None;
        self.results = ResultCache::default();
        Ok(())
    }

    fn require_bound(&self) -> AnalysisResult<&ColumnTable> {
        let table = self.require_table()?;
        if !self.bound {
            return Err(AnalysisError::missing("please select columns first"));
        }
        Ok(table)
    }

    fn require_hotfire(&self) -> AnalysisResult<&ColumnTable> {
        let table = self.require_bound()?;
        if self.bindings.thrust.is_empty() {
            return Err(AnalysisError::missing(
                "please select at least one thrust column",
            ));
        }
        Ok(table)
    }

    // -----------------------------------------------------------------------
    // Series resolution
    // -----------------------------------------------------------------------

    fn numeric_column(table: &ColumnTable, name: &str) -> AnalysisResult<Vec<f64>> {
        table
            .column(name)
            .map(coerce::numeric_series)
            .ok_or_else(|| AnalysisError::missing(format!("no column named '{name}'")))
    }

    /// Time in seconds for every row.
    pub fn time_series(&self) -> AnalysisResult<Vec<f64>> {
        let table = self.require_bound()?;
        let name = self
            .bindings
            .time
            .as_deref()
            .ok_or_else(|| AnalysisError::missing("select a time column"))?;
        table
            .column(name)
            .map(coerce::time_series)
            .ok_or_else(|| AnalysisError::missing(format!("no column named '{name}'")))
    }

    /// Full-length values of a source.
    pub fn resolve(&self, source: &SeriesSource) -> AnalysisResult<Vec<f64>> {
        let table = self.require_bound()?;
        match source {
            SeriesSource::Raw(name) => Self::numeric_column(table, name),
            SeriesSource::TotalThrust => {
                self.require_hotfire()?;
                let channels = self
                    .bindings
                    .thrust
                    .iter()
                    .map(|c| Self::numeric_column(table, c))
                    .collect::<AnalysisResult<Vec<_>>>()?;
                Ok(series::sum_ignoring_nan(&channels))
            }
            SeriesSource::ChamberPressure => {
                let name = self
                    .bindings
                    .chamber_pressure
                    .as_deref()
                    .ok_or_else(|| AnalysisError::missing("chamber pressure column not selected"))?;
                Self::numeric_column(table, name)
            }
            SeriesSource::OfRatio => self.of_ratio(),
        }
    }

    /// O/F over every row, independent of the window.
    pub fn of_ratio(&self) -> AnalysisResult<Vec<f64>> {
        let table = self.require_bound()?;
        let (Some(fuel), Some(ox)) = (&self.bindings.fuel_weight, &self.bindings.oxidizer_weight)
        else {
            return Err(AnalysisError::missing(
                "fuel and oxidizer columns not selected",
            ));
        };
        let fuel = Self::numeric_column(table, fuel)?;
        let ox = Self::numeric_column(table, ox)?;
        Ok(metrics::of_ratio(&fuel, &ox))
    }

    // -----------------------------------------------------------------------
    // Window & burn metrics
    // -----------------------------------------------------------------------

    /// Build the primary window.
    ///
    /// An empty threshold window installs an all-rows fallback and still
    /// returns `DegenerateWindow` so the caller can report it. Invalid
    /// parameters leave the previous window untouched.
    pub fn set_window(&mut self, mode: WindowMode) -> AnalysisResult<&Window> {
        let time = self.time_series()?;
        let thrust = match mode {
            WindowMode::Threshold { .. } => self.resolve(&SeriesSource::TotalThrust)?,
            WindowMode::TimeRange { .. } => Vec::new(),
        };

        if let WindowMode::Threshold { target } = mode {
            if target.is_finite() {
                self.last_target_thrust = Some(target);
            }
        }

        match window::build_window(mode, &time, &thrust) {
            Ok(primary) => {
                self.results.clear(CalcKind::Burn);
                let window = self.window.insert(Window {
                    mode,
                    primary,
                    fallback: false,
                });
                Ok(&*window)
            }
            Err(err @ AnalysisError::DegenerateWindow(_)) => {
                log::warn!("{err}; falling back to all rows");
                self.results.clear(CalcKind::Burn);
                self.window = Some(Window {
                    mode,
                    primary: Mask::all(time.len()),
                    fallback: true,
                });
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Burn time, impulse and average thrust over the primary window.
    pub fn compute_burn_metrics(&mut self) -> AnalysisResult<BurnMetrics> {
        let window = self
            .window
            .as_ref()
            .ok_or_else(|| AnalysisError::missing("set a burn window first"))?;
        if window.fallback {
            return Err(AnalysisError::DegenerateWindow(
                "no data in selected window".to_string(),
            ));
        }
        let time = self.time_series()?;
        let thrust = self.resolve(&SeriesSource::TotalThrust)?;
        let burn = metrics::burn_metrics(&window.primary, &time, &thrust)?;
        self.results.store(CalcResult::Burn(burn));
        Ok(burn)
    }

    /// Window then metrics in one step.
    pub fn analyze(&mut self, mode: WindowMode) -> AnalysisResult<BurnMetrics> {
        self.set_window(mode)?;
        self.compute_burn_metrics()
    }

    /// Rows to display: primary window (or all rows) widened by the margin,
    /// then downsampled.
    pub fn view(&self, params: ViewParams) -> AnalysisResult<FilteredView> {
        let time = self.time_series()?;
        if !params.margin_percent.is_finite() || params.margin_percent < 0.0 {
            return Err(AnalysisError::invalid(format!(
                "margin {}% must be zero or positive",
                params.margin_percent
            )));
        }

        let base = match &self.window {
            Some(w) => w.primary.clone(),
            None => Mask::all(time.len()),
        };
        let mask = if params.margin_percent > 0.0 {
            base.expanded(params.margin_percent)
        } else {
            base
        };

        let rows = series::downsample(&mask.indices(), params.downsample);
        let time = rows.iter().map(|&i| time[i]).collect();
        Ok(FilteredView { rows, time })
    }

    // -----------------------------------------------------------------------
    // Cold-flow chain: ṁ → CdA → set pressure
    // -----------------------------------------------------------------------

    fn range_mask(&self, start: f64, end: f64) -> AnalysisResult<(Vec<f64>, Mask)> {
        if !start.is_finite() || !end.is_finite() {
            return Err(AnalysisError::invalid("select start and end times"));
        }
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let time = self.time_series()?;
        let mask = Mask::from_time_range(&time, start, end);
        Ok((time, mask))
    }

    /// Tank-weight regression over `[start, end]`; the bounds may be given in
    /// either order. Insufficient data clears any previous ṁ.
    pub fn compute_mass_flow(&mut self, weight: &SeriesSource, start: f64, end: f64) -> AnalysisResult<f64> {
        let (time, mask) = self.range_mask(start, end)?;
        let weight = self.resolve(weight)?;
        match physics::mass_flow_from_weight(&mask.select(&time), &mask.select(&weight)) {
            Ok(mdot) => {
                self.results.store(CalcResult::MassFlow(mdot));
                Ok(mdot)
            }
            Err(err) => {
                if matches!(err, AnalysisError::InsufficientData(_)) {
                    self.results.clear(CalcKind::MassFlow);
                }
                Err(err)
            }
        }
    }

    /// Mean of a source over `[start, end]`.
    pub fn range_average(&self, source: &SeriesSource, start: f64, end: f64) -> AnalysisResult<f64> {
        let (_, mask) = self.range_mask(start, end)?;
        let values = mask.select(&self.resolve(source)?);
        if values.iter().all(|v| v.is_nan()) {
            return Err(AnalysisError::insufficient("no data in selected time range"));
        }
        Ok(series::mean(&values))
    }

    /// CdA from an explicit ṁ or the cached one.
    pub fn compute_cda(
        &mut self,
        mdot: Option<f64>,
        p_high_psi: f64,
        p_low_psi: f64,
        density: f64,
    ) -> AnalysisResult<f64> {
        let mdot = mdot
            .or_else(|| self.results.mass_flow())
            .ok_or_else(|| AnalysisError::missing("select a time range to calculate ṁ first"))?;
        let value = physics::cda(mdot, p_high_psi, p_low_psi, density)?;
        self.results.store(CalcResult::CdA(value));
        Ok(value)
    }

    /// Set pressure from explicit or cached CdA and ṁ.
    pub fn compute_set_pressure(
        &mut self,
        cda: Option<f64>,
        mdot: Option<f64>,
        density: f64,
        manifold_psi: f64,
    ) -> AnalysisResult<SetPressure> {
        let cda = cda
            .or_else(|| self.results.cda())
            .ok_or_else(|| AnalysisError::missing("please calculate CdA first"))?;
        let mdot = mdot
            .or_else(|| self.results.mass_flow())
            .ok_or_else(|| AnalysisError::missing("please calculate ṁ first"))?;
        let result = physics::set_pressure(cda, mdot, density, manifold_psi)?;
        self.results.store(CalcResult::SetPressure(result));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;

    /// 11 rows, 1 s apart; thrust ramps 0→100→0, fuel tank drains 1 lb/s.
    fn table() -> ColumnTable {
        let thrust = [0.0, 20.0, 60.0, 100.0, 100.0, 100.0, 100.0, 100.0, 60.0, 20.0, 0.0];
        let rows = (0..11)
            .map(|i| {
                vec![
                    CellValue::Integer(i),
                    CellValue::Float(thrust[i as usize] / 2.0),
                    CellValue::Float(thrust[i as usize] / 2.0),
                    CellValue::Float(300.0),
                    CellValue::Float(20.0 - i as f64),
                    CellValue::Float(50.0 - 2.5 * i as f64),
                ]
            })
            .collect();
        ColumnTable::new(
            [
                "Time (s)",
                "Thrust A (lbf)",
                "Thrust B (lbf)",
                "Chamber Pressure (psi)",
                "Fuel Weight (lbs)",
                "Ox Weight (lbs)",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rows,
        )
        .unwrap()
    }

    fn bound_session() -> Session {
        let mut s = Session::new();
        s.load(table());
        let guessed = s.bindings().clone();
        s.bind(guessed).unwrap();
        s
    }

    #[test]
    fn phases_advance_and_reset() {
        let mut s = Session::new();
        assert_eq!(s.phase(), Phase::Empty);
        s.load(table());
        assert_eq!(s.phase(), Phase::Empty);
        s.bind(s.bindings().clone()).unwrap();
        assert_eq!(s.phase(), Phase::ColumnsBound);
        s.set_window(WindowMode::Threshold { target: 100.0 }).unwrap();
        assert_eq!(s.phase(), Phase::WindowSet);
        s.compute_burn_metrics().unwrap();
        assert_eq!(s.phase(), Phase::MetricsComputed);

        s.bind(s.bindings().clone()).unwrap();
        assert_eq!(s.phase(), Phase::ColumnsBound);
        assert!(s.last_target_thrust().is_none());
        s.load(table());
        assert_eq!(s.phase(), Phase::Empty);
    }

    #[test]
    fn nothing_works_without_a_file() {
        let mut s = Session::new();
        assert!(matches!(
            s.bind(ColumnBindings::default()),
            Err(AnalysisError::InputMissing(_))
        ));
        assert!(matches!(s.time_series(), Err(AnalysisError::InputMissing(_))));
    }

    #[test]
    fn binding_requires_existing_time_column() {
        let mut s = Session::new();
        s.load(table());
        let mut b = s.bindings().clone();
        b.time = None;
        assert!(matches!(s.bind(b), Err(AnalysisError::InputMissing(_))));
        let mut b = s.bindings().clone();
        b.chamber_pressure = Some("nope".into());
        assert!(matches!(s.bind(b), Err(AnalysisError::InvalidParameter(_))));
    }

    #[test]
    fn threshold_analysis_matches_hand_calculation() {
        let mut s = bound_session();
        let m = s.analyze(WindowMode::Threshold { target: 100.0 }).unwrap();
        // rows 2..=8 (60..100..60)
        assert_eq!(m.burn_time, 6.0);
        assert!((m.total_impulse - 560.0).abs() < 1e-9);
        assert!((m.average_thrust - 560.0 / 6.0).abs() < 1e-9);
        assert_eq!(s.last_target_thrust(), Some(100.0));
        assert_eq!(s.results().burn(), Some(m));
    }

    #[test]
    fn degenerate_threshold_falls_back_to_all_rows() {
        let mut s = bound_session();
        let err = s.set_window(WindowMode::Threshold { target: 10_000.0 }).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateWindow(_)));
        let w = s.window().unwrap();
        assert!(w.fallback);
        assert_eq!(w.primary.count(), 11);
        assert!(s.compute_burn_metrics().is_err());
    }

    #[test]
    fn invalid_range_keeps_previous_window() {
        let mut s = bound_session();
        s.set_window(WindowMode::TimeRange { start: 2.0, end: 4.0 }).unwrap();
        let before = s.window().cloned();
        assert!(s
            .set_window(WindowMode::TimeRange { start: f64::NAN, end: 4.0 })
            .is_err());
        assert_eq!(s.window().cloned(), before);
    }

    #[test]
    fn view_expands_then_downsamples() {
        let mut s = bound_session();
        s.set_window(WindowMode::TimeRange { start: 4.0, end: 6.0 }).unwrap();
        let v = s
            .view(ViewParams {
                margin_percent: 10.0,
                downsample: 2,
            })
            .unwrap();
        // 10% of 11 rows → 1 extra each side: rows 3..=7, every 2nd
        assert_eq!(v.rows, vec![3, 5, 7]);
        assert_eq!(v.time, vec![3.0, 5.0, 7.0]);
        assert_eq!(v.pick(&s.resolve(&SeriesSource::TotalThrust).unwrap()), vec![100.0; 3]);
    }

    #[test]
    fn view_without_window_covers_everything() {
        let s = bound_session();
        let v = s.view(ViewParams::default()).unwrap();
        assert_eq!(v.rows.len(), 11);
        assert!(s
            .view(ViewParams {
                margin_percent: -1.0,
                downsample: 1
            })
            .is_err());
    }

    #[test]
    fn of_ratio_is_unmasked() {
        let mut s = bound_session();
        s.set_window(WindowMode::TimeRange { start: 4.0, end: 6.0 }).unwrap();
        let of = s.of_ratio().unwrap();
        assert_eq!(of.len(), 11);
        assert!((of[0] - 2.5).abs() < 1e-5);
    }

    #[test]
    fn cold_flow_chain_copies_forward() {
        let mut s = bound_session();
        let weight = SeriesSource::Raw("Fuel Weight (lbs)".into());
        let mdot = s.compute_mass_flow(&weight, 8.0, 2.0).unwrap();
        assert!((mdot - physics::LBS_TO_KG).abs() < 1e-9);

        let cda = s.compute_cda(None, 100.0, 14.7, 820.0).unwrap();
        assert_eq!(s.results().cda(), Some(cda));

        let set = s.compute_set_pressure(None, None, 820.0, 14.7).unwrap();
        assert!((set.psi - 100.0).abs() < 1e-6);
    }

    #[test]
    fn cda_without_mdot_is_missing_input() {
        let mut s = bound_session();
        assert!(matches!(
            s.compute_cda(None, 100.0, 14.7, 820.0),
            Err(AnalysisError::InputMissing(_))
        ));
    }

    #[test]
    fn insufficient_range_clears_mass_flow_but_bad_cda_keeps_results() {
        let mut s = bound_session();
        let weight = SeriesSource::Raw("Fuel Weight (lbs)".into());
        s.compute_mass_flow(&weight, 0.0, 10.0).unwrap();
        s.compute_cda(None, 100.0, 14.7, 820.0).unwrap();

        assert!(s.compute_cda(None, 10.0, 14.7, 820.0).is_err());
        assert!(s.results().cda().is_some());

        assert!(matches!(
            s.compute_mass_flow(&weight, 3.2, 3.4),
            Err(AnalysisError::InsufficientData(_))
        ));
        assert!(s.results().mass_flow().is_none());
        assert!(s.results().cda().is_some());
    }

    #[test]
    fn range_average_needs_samples() {
        let s = bound_session();
        let pc = SeriesSource::ChamberPressure;
        assert_eq!(s.range_average(&pc, 0.0, 3.0).unwrap(), 300.0);
        assert!(matches!(
            s.range_average(&pc, 20.0, 30.0),
            Err(AnalysisError::InsufficientData(_))
        ));
    }
}
