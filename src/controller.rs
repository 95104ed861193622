//! User actions. Each one runs against the [`Session`], then pushes charts,
//! metric tables and notices to the [`Presentation`] side. Errors never
//! escape an action; they become notifications.

use std::path::Path;

use crate::analysis::metrics::{self, format_value};
use crate::analysis::physics::{self, FlowRates, VenturiSpec};
use crate::analysis::series;
use crate::config::AnalyzerConfig;
use crate::data::loader;
use crate::data::model::ColumnTable;
use crate::data::window::{threshold_bounds, WindowMode};
use crate::error::{AnalysisError, AnalysisResult};
use crate::presentation::{NoticeLevel, PlotData, Presentation, ReferenceLine, SeriesLine, ValuePrompt};
use crate::session::{ColumnBindings, FilteredView, Session, SeriesSource, ViewParams};

const TIME_LABEL: &str = "Time (s)";

/// Which propellant a venturi measures; picks the density preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propellant {
    Fuel,
    Oxidizer,
}

impl Propellant {
    pub fn label(self) -> &'static str {
        match self {
            Propellant::Fuel => "Fuel",
            Propellant::Oxidizer => "Oxidizer",
        }
    }
}

/// Ask for fuel and oxidizer mass flow (lb/s). `None` if either is cancelled.
pub fn prompt_flow_rates(prompt: &mut dyn ValuePrompt) -> Option<FlowRates> {
    let fuel_lbs = prompt.request("Input", "Mass flow rate of fuel (lbs/s):")?;
    let oxidizer_lbs = prompt.request("Input", "Mass flow rate of oxidizer (lbs/s):")?;
    Some(FlowRates {
        fuel_lbs,
        oxidizer_lbs,
    })
}

pub struct Analyzer {
    session: Session,
    config: AnalyzerConfig,
    view: ViewParams,
    source_name: Option<String>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            session: Session::new(),
            config,
            view: ViewParams::default(),
            source_name: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn view_params(&self) -> ViewParams {
        self.view
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    fn notify(out: &mut dyn Presentation, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Error => log::error!("{message}"),
            NoticeLevel::Warning => log::warn!("{message}"),
            NoticeLevel::Success | NoticeLevel::Info => log::info!("{message}"),
        }
        out.notify(level, message);
    }

    fn report(out: &mut dyn Presentation, err: &AnalysisError) {
        Self::notify(out, err.level(), &err.to_string());
    }

    fn cancelled(action: &str) {
        log::debug!("{action} cancelled");
    }

    // -----------------------------------------------------------------------
    // Loading & binding
    // -----------------------------------------------------------------------

    pub fn load_file(&mut self, path: &Path, out: &mut dyn Presentation) -> bool {
        match loader::load_file(path) {
            Ok(table) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.load_table(table, &name, out);
                true
            }
            Err(e) => {
                Self::notify(out, NoticeLevel::Error, &format!("Error parsing file: {e:#}"));
                false
            }
        }
    }

    pub fn load_table(&mut self, table: ColumnTable, name: &str, out: &mut dyn Presentation) {
        log::info!(
            "Loaded {name}: {} rows × {} columns",
            table.len(),
            table.columns().len()
        );
        let rows = table.len();
        self.session.load(table);
        self.source_name = Some(name.to_string());
        self.view = ViewParams::default();
        out.show_metrics(&[]);
        Self::notify(
            out,
            NoticeLevel::Success,
            &format!("Loaded {rows} rows from {name}"),
        );
    }

    pub fn bind_columns(&mut self, bindings: ColumnBindings, out: &mut dyn Presentation) -> bool {
        match self.session.bind(bindings) {
            Ok(()) => {
                out.show_metrics(&[]);
                if !self.session.bindings().is_hotfire_ready() {
                    Self::notify(
                        out,
                        NoticeLevel::Info,
                        "No thrust column selected; only cold-flow tools are available",
                    );
                }
                true
            }
            Err(e) => {
                Self::report(out, &e);
                false
            }
        }
    }

    /// Margin (%) and downsample factor for every windowed plot.
    pub fn set_view(&mut self, margin_percent: f64, downsample: usize, out: &mut dyn Presentation) -> bool {
        let max_margin = self.config.max_margin_percent;
        if !(0.0..=max_margin).contains(&margin_percent) {
            Self::report(
                out,
                &AnalysisError::invalid(format!(
                    "margin {margin_percent}% must be between 0 and {max_margin}%"
                )),
            );
            return false;
        }
        if downsample == 0 || downsample > self.config.max_downsample {
            Self::report(
                out,
                &AnalysisError::invalid(format!(
                    "downsample factor must be between 1 and {}",
                    self.config.max_downsample
                )),
            );
            return false;
        }
        self.view = ViewParams {
            margin_percent,
            downsample,
        };
        true
    }

    // -----------------------------------------------------------------------
    // Burn analysis
    // -----------------------------------------------------------------------

    /// Build the window, compute burn metrics and plot thrust over the view.
    pub fn analyze(&mut self, mode: WindowMode, out: &mut dyn Presentation) {
        match self.session.analyze(mode) {
            Ok(burn) => {
                out.show_metrics(&self.result_rows());
                Self::notify(
                    out,
                    NoticeLevel::Success,
                    &format!(
                        "Burn time {} s, impulse {} lbf·s",
                        format_value(burn.burn_time, 3),
                        format_value(burn.total_impulse, 2)
                    ),
                );
                self.plot_source(&SeriesSource::TotalThrust, out);
            }
            Err(e) => {
                Self::report(out, &e);
                if matches!(e, AnalysisError::DegenerateWindow(_)) {
                    out.show_metrics(&self.result_rows());
                    self.plot_test_data(out);
                }
            }
        }
    }

    /// Threshold analysis with the target thrust asked for interactively.
    pub fn analyze_with_prompt(&mut self, prompt: &mut dyn ValuePrompt, out: &mut dyn Presentation) {
        let Some(target) = prompt.request("Target Thrust", "Expected target thrust (lbf):") else {
            Self::cancelled("target thrust");
            return;
        };
        self.analyze(WindowMode::Threshold { target }, out);
    }

    /// Every cached result as display rows.
    pub fn result_rows(&self) -> Vec<(String, String)> {
        let results = self.session.results();
        let mut rows = results.burn().map(|b| b.display_rows()).unwrap_or_default();
        if let Some(mdot) = results.mass_flow() {
            rows.push(("Mass Flow (kg/s)".into(), format_value(mdot, 4)));
        }
        if let Some(cda) = results.cda() {
            rows.push(("CdA (m²)".into(), format_value(cda, 8)));
            rows.push(("CdA (mm²)".into(), format_value(cda * 1e6, 4)));
        }
        if let Some(set) = results.set_pressure() {
            rows.push(("Set Pressure (psi)".into(), format_value(set.psi, 2)));
            rows.push(("Set Pressure (Pa)".into(), format_value(set.pa, 0)));
        }
        rows
    }

    // -----------------------------------------------------------------------
    // Plots
    // -----------------------------------------------------------------------

    fn current_view(&self) -> AnalysisResult<FilteredView> {
        self.session.view(self.view)
    }

    fn target_lines(&self, plot: PlotData) -> PlotData {
        match self.session.last_target_thrust() {
            Some(target) => {
                let (lower, upper) = threshold_bounds(target);
                plot.with_reference(format!("Target: {target} lbf"), target)
                    .with_reference(format!("50%: {lower:.0} lbf"), lower)
                    .with_reference(format!("150%: {upper:.0} lbf"), upper)
            }
            None => plot,
        }
    }

    fn titled(source: &SeriesSource) -> (String, String) {
        match source {
            SeriesSource::TotalThrust => ("Thrust vs Time".into(), "Thrust (lbf)".into()),
            SeriesSource::ChamberPressure => {
                ("Chamber Pressure vs Time".into(), "Pressure (psi)".into())
            }
            SeriesSource::OfRatio => ("O/F Ratio vs Time".into(), "O/F Ratio".into()),
            SeriesSource::Raw(name) => (name.clone(), name.clone()),
        }
    }

    /// One source over the filtered view.
    pub fn plot_source(&mut self, source: &SeriesSource, out: &mut dyn Presentation) {
        let plot = (|| {
            let view = self.current_view()?;
            let y = view.pick(&self.session.resolve(source)?);
            let (title, y_label) = Self::titled(source);
            Ok::<_, AnalysisError>(PlotData::single(title, TIME_LABEL, y_label, view.time, y))
        })();
        match plot {
            Ok(plot) if *source == SeriesSource::TotalThrust => out.show_plot(self.target_lines(plot)),
            Ok(plot) => out.show_plot(plot),
            Err(e) => Self::report(out, &e),
        }
    }

    /// Total thrust over every row, thinned to the point budget.
    pub fn plot_test_data(&mut self, out: &mut dyn Presentation) {
        let data = self
            .session
            .time_series()
            .and_then(|t| Ok((t, self.session.resolve(&SeriesSource::TotalThrust)?)));
        let (time, thrust) = match data {
            Ok(v) => v,
            Err(e) => return Self::report(out, &e),
        };

        let max_points = self.config.max_plot_points.max(1);
        let factor = time.len().div_ceil(max_points);
        let (time, thrust) = if time.len() > max_points {
            Self::notify(
                out,
                NoticeLevel::Info,
                &format!("Data downsampled by factor of {factor} for display"),
            );
            (series::downsample(&time, factor), series::downsample(&thrust, factor))
        } else {
            (time, thrust)
        };

        let plot = PlotData::single(
            "Test Data: Total Thrust (All Data)",
            TIME_LABEL,
            "Thrust (lbf)",
            time,
            thrust,
        );
        out.show_plot(self.target_lines(plot));
    }

    /// Several sources on one chart, plus labelled constant lines.
    pub fn plot_custom(
        &mut self,
        sources: &[SeriesSource],
        constants: &[ReferenceLine],
        out: &mut dyn Presentation,
    ) {
        if sources.is_empty() {
            return Self::report(out, &AnalysisError::missing("select at least one series"));
        }
        let lines = (|| {
            let view = self.current_view()?;
            let lines = sources
                .iter()
                .map(|s| {
                    Ok::<_, AnalysisError>(SeriesLine {
                        name: s.to_string(),
                        unit: s.unit(),
                        y: view.pick(&self.session.resolve(s)?),
                    })
                })
                .collect::<AnalysisResult<Vec<_>>>()?;
            Ok::<_, AnalysisError>((view.time, lines))
        })();
        let (x, lines) = match lines {
            Ok(v) => v,
            Err(e) => return Self::report(out, &e),
        };

        let first_unit = lines[0].unit.clone();
        let y_label = match first_unit {
            Some(unit) if lines.iter().all(|l| l.unit.as_ref() == Some(&unit)) => {
                format!("Value ({unit})")
            }
            _ => "Value".to_string(),
        };
        out.show_plot(PlotData {
            title: "Custom Plot".into(),
            x_label: TIME_LABEL.into(),
            y_label,
            x,
            lines,
            references: constants.to_vec(),
        });
    }

    fn windowed(&self, source: &SeriesSource) -> AnalysisResult<(Vec<f64>, Vec<f64>)> {
        let view = self.current_view()?;
        let y = view.pick(&self.session.resolve(source)?);
        Ok((view.time, y))
    }

    pub fn plot_isp(&mut self, prompt: &mut dyn ValuePrompt, out: &mut dyn Presentation) {
        if let Err(e) = self.windowed(&SeriesSource::TotalThrust) {
            return Self::report(out, &e);
        }
        let Some(flow) = prompt_flow_rates(prompt) else {
            return Self::cancelled("ISP");
        };
        let plot = self.windowed(&SeriesSource::TotalThrust).and_then(|(t, thrust)| {
            let isp = physics::specific_impulse(&thrust, flow)?;
            Ok(PlotData::single("ISP vs Time", TIME_LABEL, "ISP (s)", t, isp))
        });
        match plot {
            Ok(plot) => out.show_plot(plot),
            Err(e) => Self::report(out, &e),
        }
    }

    pub fn plot_exhaust_velocity(&mut self, prompt: &mut dyn ValuePrompt, out: &mut dyn Presentation) {
        if let Err(e) = self.windowed(&SeriesSource::TotalThrust) {
            return Self::report(out, &e);
        }
        let Some(flow) = prompt_flow_rates(prompt) else {
            return Self::cancelled("exhaust velocity");
        };
        let plot = self.windowed(&SeriesSource::TotalThrust).and_then(|(t, thrust)| {
            let ve = physics::exhaust_velocity(&physics::specific_impulse(&thrust, flow)?);
            Ok(PlotData::single(
                "Exhaust Velocity (Ve) vs Time",
                TIME_LABEL,
                "Exhaust Velocity (m/s)",
                t,
                ve,
            ))
        });
        match plot {
            Ok(plot) => out.show_plot(plot),
            Err(e) => Self::report(out, &e),
        }
    }

    pub fn plot_cstar(&mut self, prompt: &mut dyn ValuePrompt, out: &mut dyn Presentation) {
        if let Err(e) = self.windowed(&SeriesSource::ChamberPressure) {
            return Self::report(out, &e);
        }
        let Some(flow) = prompt_flow_rates(prompt) else {
            return Self::cancelled("c*");
        };
        let Some(throat_ft2) = prompt.request("Input", "Throat area (ft²):") else {
            return Self::cancelled("c*");
        };
        let plot = self.windowed(&SeriesSource::ChamberPressure).and_then(|(t, pc)| {
            let cstar = physics::characteristic_velocity(&pc, flow, throat_ft2)?;
            Ok(PlotData::single(
                "Characteristic Velocity (c*) vs Time",
                TIME_LABEL,
                "c* (m/s)",
                t,
                cstar,
            ))
        });
        match plot {
            Ok(plot) => out.show_plot(plot),
            Err(e) => Self::report(out, &e),
        }
    }

    /// Venturi geometry with density, Cd and Y from the config presets.
    pub fn venturi_preset(&self, propellant: Propellant, inlet_area_in2: f64, throat_area_in2: f64) -> VenturiSpec {
        VenturiSpec {
            inlet_area_in2,
            throat_area_in2,
            cd: self.config.venturi_cd,
            expansion: self.config.venturi_expansion,
            density: match propellant {
                Propellant::Fuel => self.config.fuel_density,
                Propellant::Oxidizer => self.config.oxidizer_density,
            },
        }
    }

    /// Venturi ṁ over the view, then mean and max of the flowing samples.
    pub fn plot_venturi(
        &mut self,
        propellant: Propellant,
        p1_column: &str,
        p2_column: &str,
        spec: &VenturiSpec,
        out: &mut dyn Presentation,
    ) {
        let result = (|| {
            let (t, p1) = self.windowed(&SeriesSource::Raw(p1_column.to_string()))?;
            let (_, p2) = self.windowed(&SeriesSource::Raw(p2_column.to_string()))?;
            let mdot = physics::venturi_mass_flow(&p1, &p2, spec)?;
            Ok::<_, AnalysisError>((t, mdot))
        })();
        let (t, mdot) = match result {
            Ok(v) => v,
            Err(e) => return Self::report(out, &e),
        };

        let label = propellant.label();
        match physics::flow_summary(&mdot) {
            Some(s) => Self::notify(
                out,
                NoticeLevel::Success,
                &format!(
                    "{label} venturi: mean ṁ {} kg/s, max ṁ {} kg/s",
                    format_value(s.mean, 4),
                    format_value(s.max, 4)
                ),
            ),
            None => Self::notify(
                out,
                NoticeLevel::Warning,
                &format!("{label} venturi shows no positive flow in the window"),
            ),
        }
        out.show_plot(PlotData::single(
            format!("{label} Venturi Mass Flow"),
            TIME_LABEL,
            "Mass Flow (kg/s)",
            t,
            mdot,
        ));
    }

    // -----------------------------------------------------------------------
    // Cold-flow calculators
    // -----------------------------------------------------------------------

    pub fn compute_mass_flow(&mut self, weight_column: &str, start: f64, end: f64, out: &mut dyn Presentation) -> Option<f64> {
        let source = SeriesSource::Raw(weight_column.to_string());
        let result = self.session.compute_mass_flow(&source, start, end);
        out.show_metrics(&self.result_rows());
        match result {
            Ok(mdot) => {
                Self::notify(
                    out,
                    NoticeLevel::Success,
                    &format!("ṁ = {} kg/s", format_value(mdot, 4)),
                );
                Some(mdot)
            }
            Err(e) => {
                Self::report(out, &e);
                None
            }
        }
    }

    /// Mean of a column over a time range, for filling in P_high or P_low.
    pub fn range_average(&mut self, column: &str, start: f64, end: f64, out: &mut dyn Presentation) -> Option<f64> {
        let source = SeriesSource::Raw(column.to_string());
        match self.session.range_average(&source, start, end) {
            Ok(avg) => {
                let unit = metrics::extract_unit(column).unwrap_or("");
                Self::notify(
                    out,
                    NoticeLevel::Info,
                    &format!("Average {column}: {} {unit}", format_value(avg, 2)),
                );
                Some(avg)
            }
            Err(e) => {
                Self::report(out, &e);
                None
            }
        }
    }

    /// CdA from the cached ṁ.
    pub fn compute_cda(&mut self, p_high_psi: f64, p_low_psi: f64, density: f64, out: &mut dyn Presentation) -> Option<f64> {
        match self.session.compute_cda(None, p_high_psi, p_low_psi, density) {
            Ok(cda) => {
                out.show_metrics(&self.result_rows());
                Self::notify(
                    out,
                    NoticeLevel::Success,
                    &format!(
                        "CdA = {} m² ({} mm²)",
                        format_value(cda, 8),
                        format_value(cda * 1e6, 4)
                    ),
                );
                Some(cda)
            }
            Err(e) => {
                Self::report(out, &e);
                None
            }
        }
    }

    /// Set pressure; `None` inputs are taken from the previous calculators.
    pub fn compute_set_pressure(
        &mut self,
        cda: Option<f64>,
        mdot: Option<f64>,
        density: f64,
        manifold_psi: f64,
        out: &mut dyn Presentation,
    ) -> Option<f64> {
        match self.session.compute_set_pressure(cda, mdot, density, manifold_psi) {
            Ok(set) => {
                out.show_metrics(&self.result_rows());
                Self::notify(
                    out,
                    NoticeLevel::Success,
                    &format!(
                        "Set pressure = {} psi ({} Pa)",
                        format_value(set.psi, 2),
                        format_value(set.pa, 0)
                    ),
                );
                Some(set.psi)
            }
            Err(e) => {
                Self::report(out, &e);
                None
            }
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}
