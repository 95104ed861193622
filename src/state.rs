use std::collections::{BTreeSet, VecDeque};
use std::path::Path;

use rusty_hotfire::analysis::physics::AMBIENT_PSI;
use rusty_hotfire::config::AnalyzerConfig;
use rusty_hotfire::controller::{Analyzer, Propellant};
use rusty_hotfire::data::window::{self, WindowMode};
use rusty_hotfire::error::AnalysisError;
use rusty_hotfire::presentation::{NoticeLevel, PlotData, Presentation, ReferenceLine, ValuePrompt};
use rusty_hotfire::session::{ColdFlowHints, ColumnBindings, SeriesSource};

const MAX_NOTICES: usize = 8;

// ---------------------------------------------------------------------------
// Presentation side: what the panels draw
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Latest chart, metric table and notices pushed by the analyzer.
#[derive(Debug, Default)]
pub struct Display {
    pub plot: Option<PlotData>,
    pub metrics: Vec<(String, String)>,
    pub notices: VecDeque<Notice>,
    /// Indices picked on the current plot for the two-point average.
    pub picks: Vec<usize>,
}

impl Presentation for Display {
    fn show_plot(&mut self, plot: PlotData) {
        self.plot = Some(plot.without_gaps());
        self.picks.clear();
    }

    fn show_metrics(&mut self, metrics: &[(String, String)]) {
        self.metrics = metrics.to_vec();
    }

    fn notify(&mut self, level: NoticeLevel, message: &str) {
        self.notices.push_front(Notice {
            level,
            message: message.to_string(),
        });
        self.notices.truncate(MAX_NOTICES);
    }
}

fn report(out: &mut Display, err: &AnalysisError) {
    log::warn!("{err}");
    out.notify(err.level(), &err.to_string());
}

/// Parse a form field, reporting a bad value.
fn field(out: &mut Display, name: &str, text: &str) -> Option<f64> {
    window::parse_bound(name, text)
        .map_err(|e| report(out, &e))
        .ok()
}

/// Blank parses to `Some(None)`; a bad value is reported and yields `None`.
fn optional_field(out: &mut Display, name: &str, text: &str) -> Option<Option<f64>> {
    if text.trim().is_empty() {
        return Some(None);
    }
    field(out, name, text).map(Some)
}

// ---------------------------------------------------------------------------
// Value prompts
// ---------------------------------------------------------------------------

/// Actions that need scalar inputs before they can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptedAction {
    TargetThrust,
    Isp,
    ExhaustVelocity,
    CStar,
}

impl PromptedAction {
    pub fn title(self) -> &'static str {
        match self {
            PromptedAction::TargetThrust => "Target Thrust",
            PromptedAction::Isp => "Specific Impulse",
            PromptedAction::ExhaustVelocity => "Exhaust Velocity",
            PromptedAction::CStar => "Characteristic Velocity",
        }
    }

    pub fn fields(self) -> &'static [&'static str] {
        const FLOW: [&str; 2] = ["Fuel ṁ (lbs/s)", "Oxidizer ṁ (lbs/s)"];
        match self {
            PromptedAction::TargetThrust => &["Expected target thrust (lbf)"],
            PromptedAction::Isp | PromptedAction::ExhaustVelocity => &FLOW,
            PromptedAction::CStar => &["Fuel ṁ (lbs/s)", "Oxidizer ṁ (lbs/s)", "Throat area (ft²)"],
        }
    }
}

/// Dialog collecting the inputs of one prompted action.
#[derive(Debug, Clone)]
pub struct PromptForm {
    pub action: PromptedAction,
    pub inputs: Vec<String>,
}

/// Answers the analyzer's prompts with values the dialog already collected.
struct Answers(VecDeque<f64>);

impl ValuePrompt for Answers {
    fn request(&mut self, title: &str, message: &str) -> Option<f64> {
        log::debug!("{title}: {message}");
        self.0.pop_front()
    }
}

// ---------------------------------------------------------------------------
// Form state
// ---------------------------------------------------------------------------

pub struct WindowForm {
    pub use_range: bool,
    pub start: String,
    pub end: String,
}

pub struct ColdFlowForm {
    pub weight_column: Option<String>,
    pub high_column: Option<String>,
    /// `None` uses the ambient preset.
    pub low_column: Option<String>,
    pub start: String,
    pub end: String,
    pub p_high: String,
    pub p_low: String,
    pub density: String,
    pub manifold: String,
    /// Set-pressure inputs; blank falls back to the calculated values.
    pub cda: String,
    pub mdot: String,
}

pub struct VenturiForm {
    pub propellant: Propellant,
    pub p1_column: Option<String>,
    pub p2_column: Option<String>,
    pub inlet_area: String,
    pub throat_area: String,
    pub cd: String,
    pub expansion: String,
    pub density: String,
}

#[derive(Default)]
pub struct CustomPlotForm {
    pub selected: BTreeSet<SeriesSource>,
    pub constants: Vec<ReferenceLine>,
    pub new_label: String,
    pub new_value: String,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub analyzer: Analyzer,
    pub display: Display,

    /// Bindings being edited; applied with "Apply columns".
    pub draft: ColumnBindings,

    pub window_form: WindowForm,
    pub cold_flow: ColdFlowForm,
    pub venturi: VenturiForm,
    pub custom: CustomPlotForm,
    pub prompt: Option<PromptForm>,

    /// 0..=100, mapped exponentially onto the margin percentage.
    pub margin_slider: u8,
    pub downsample: usize,
    /// Moving-average window applied when drawing; 1 is off.
    pub smoothing: usize,
}

impl AppState {
    pub fn new(config: AnalyzerConfig) -> Self {
        let cold_flow = ColdFlowForm {
            weight_column: None,
            high_column: None,
            low_column: None,
            start: String::new(),
            end: String::new(),
            p_high: String::new(),
            p_low: config.ambient_pressure_psi.to_string(),
            density: config.fuel_density.to_string(),
            manifold: AMBIENT_PSI.to_string(),
            cda: String::new(),
            mdot: String::new(),
        };
        let venturi = VenturiForm {
            propellant: Propellant::Fuel,
            p1_column: None,
            p2_column: None,
            inlet_area: String::new(),
            throat_area: String::new(),
            cd: config.venturi_cd.to_string(),
            expansion: config.venturi_expansion.to_string(),
            density: config.fuel_density.to_string(),
        };
        Self {
            analyzer: Analyzer::new(config),
            display: Display::default(),
            draft: ColumnBindings::default(),
            window_form: WindowForm {
                use_range: false,
                start: String::new(),
                end: String::new(),
            },
            cold_flow,
            venturi,
            custom: CustomPlotForm::default(),
            prompt: None,
            margin_slider: 0,
            downsample: 1,
            smoothing: 1,
        }
    }

    pub fn columns(&self) -> Vec<String> {
        self.analyzer
            .session()
            .table()
            .map(|t| t.columns().to_vec())
            .unwrap_or_default()
    }

    pub fn margin_percent(&self) -> f64 {
        window::margin_percent_from_slider(self.margin_slider)
    }

    // -----------------------------------------------------------------------
    // Loading & binding
    // -----------------------------------------------------------------------

    pub fn open_file(&mut self, path: &Path) {
        if !self.analyzer.load_file(path, &mut self.display) {
            return;
        }
        self.display.plot = None;
        self.display.picks.clear();
        self.draft = self.analyzer.session().bindings().clone();
        self.custom = CustomPlotForm::default();
        self.margin_slider = 0;
        self.downsample = 1;

        let hints = ColdFlowHints::infer(&self.columns());
        self.cold_flow.weight_column = hints.tank_weight;
        self.cold_flow.high_column = hints.feed_pressure;
        self.cold_flow.low_column = None;
    }

    pub fn apply_bindings(&mut self) {
        let draft = self.draft.clone();
        if self.analyzer.bind_columns(draft, &mut self.display) {
            self.custom.selected.clear();
            if self.analyzer.session().bindings().is_hotfire_ready() {
                self.start_prompt(PromptedAction::TargetThrust);
            }
        }
    }

    pub fn apply_view(&mut self) {
        let margin = self.margin_percent();
        self.analyzer
            .set_view(margin, self.downsample, &mut self.display);
    }

    // -----------------------------------------------------------------------
    // Prompted actions
    // -----------------------------------------------------------------------

    pub fn start_prompt(&mut self, action: PromptedAction) {
        self.prompt = Some(PromptForm {
            action,
            inputs: vec![String::new(); action.fields().len()],
        });
    }

    pub fn cancel_prompt(&mut self) {
        if let Some(form) = self.prompt.take() {
            log::debug!("{} cancelled", form.action.title());
        }
    }

    /// Run the pending action once every field parses.
    pub fn confirm_prompt(&mut self) {
        let Some(form) = self.prompt.take() else {
            return;
        };
        let parsed: Option<VecDeque<f64>> = form
            .action
            .fields()
            .iter()
            .zip(form.inputs.iter())
            .map(|(name, text)| field(&mut self.display, name, text))
            .collect();
        let Some(values) = parsed else {
            self.prompt = Some(form);
            return;
        };

        let mut answers = Answers(values);
        let out = &mut self.display;
        match form.action {
            PromptedAction::TargetThrust => self.analyzer.analyze_with_prompt(&mut answers, out),
            PromptedAction::Isp => self.analyzer.plot_isp(&mut answers, out),
            PromptedAction::ExhaustVelocity => self.analyzer.plot_exhaust_velocity(&mut answers, out),
            PromptedAction::CStar => self.analyzer.plot_cstar(&mut answers, out),
        }
    }

    // -----------------------------------------------------------------------
    // Window & plots
    // -----------------------------------------------------------------------

    pub fn run_window(&mut self) {
        if !self.window_form.use_range {
            self.start_prompt(PromptedAction::TargetThrust);
            return;
        }
        let Some(start) = field(&mut self.display, "start time", &self.window_form.start) else {
            return;
        };
        let Some(end) = field(&mut self.display, "end time", &self.window_form.end) else {
            return;
        };
        self.analyzer
            .analyze(WindowMode::TimeRange { start, end }, &mut self.display);
    }

    pub fn plot(&mut self, source: SeriesSource) {
        self.analyzer.plot_source(&source, &mut self.display);
    }

    pub fn plot_test_data(&mut self) {
        self.analyzer.plot_test_data(&mut self.display);
    }

    pub fn plot_custom(&mut self) {
        let sources: Vec<SeriesSource> = self.custom.selected.iter().cloned().collect();
        self.analyzer
            .plot_custom(&sources, &self.custom.constants, &mut self.display);
    }

    pub fn add_constant(&mut self) {
        let Some(value) = field(&mut self.display, "constant value", &self.custom.new_value) else {
            return;
        };
        let label = match self.custom.new_label.trim() {
            "" => format!("y = {value}"),
            l => l.to_string(),
        };
        self.custom.constants.push(ReferenceLine { label, value });
        self.custom.new_label.clear();
        self.custom.new_value.clear();
    }

    pub fn export_plot(&mut self) {
        let Some(plot) = &self.display.plot else {
            report(&mut self.display, &AnalysisError::missing("no plot to export"));
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .set_title("Export plot data")
            .set_file_name(format!("{}.csv", plot.title.replace(['/', '\\', '*'], "_")))
            .add_filter("CSV", &["csv"])
            .save_file()
        else {
            return;
        };

        let written = std::fs::File::create(&path)
            .map_err(anyhow::Error::from)
            .and_then(|f| plot.write_csv(f));
        match written {
            Ok(()) => {
                log::info!("Exported plot to {}", path.display());
                self.display
                    .notify(NoticeLevel::Success, &format!("Exported {}", path.display()));
            }
            Err(e) => {
                log::error!("Export failed: {e:#}");
                self.display
                    .notify(NoticeLevel::Error, &format!("Export failed: {e:#}"));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Cold flow
    // -----------------------------------------------------------------------

    fn cold_flow_range(&mut self) -> Option<(f64, f64)> {
        let start = field(&mut self.display, "start time", &self.cold_flow.start)?;
        let end = field(&mut self.display, "end time", &self.cold_flow.end)?;
        Some((start, end))
    }

    /// ṁ from the tank weight, then P_high / P_low averages over the same range.
    pub fn compute_mass_flow(&mut self) {
        let Some((start, end)) = self.cold_flow_range() else {
            return;
        };
        let Some(weight) = self.cold_flow.weight_column.clone() else {
            report(&mut self.display, &AnalysisError::missing("select a weight column"));
            return;
        };
        self.analyzer
            .compute_mass_flow(&weight, start, end, &mut self.display);

        if let Some(high) = self.cold_flow.high_column.clone() {
            if let Some(avg) = self.analyzer.range_average(&high, start, end, &mut self.display) {
                self.cold_flow.p_high = format!("{avg:.2}");
            }
        }
        match self.cold_flow.low_column.clone() {
            Some(low) => {
                if let Some(avg) = self.analyzer.range_average(&low, start, end, &mut self.display) {
                    self.cold_flow.p_low = format!("{avg:.2}");
                }
            }
            None => {
                self.cold_flow.p_low = self.analyzer.config().ambient_pressure_psi.to_string();
            }
        }
    }

    pub fn compute_cda(&mut self) {
        let Some(p_high) = field(&mut self.display, "P_high", &self.cold_flow.p_high) else {
            return;
        };
        let Some(p_low) = field(&mut self.display, "P_low", &self.cold_flow.p_low) else {
            return;
        };
        let Some(density) = field(&mut self.display, "density", &self.cold_flow.density) else {
            return;
        };
        self.analyzer
            .compute_cda(p_high, p_low, density, &mut self.display);
    }

    pub fn compute_set_pressure(&mut self) {
        let Some(density) = field(&mut self.display, "density", &self.cold_flow.density) else {
            return;
        };
        let Some(manifold) = field(&mut self.display, "manifold pressure", &self.cold_flow.manifold)
        else {
            return;
        };
        let Some(cda) = optional_field(&mut self.display, "CdA", &self.cold_flow.cda) else {
            return;
        };
        let Some(mdot) = optional_field(&mut self.display, "ṁ", &self.cold_flow.mdot) else {
            return;
        };
        self.analyzer
            .compute_set_pressure(cda, mdot, density, manifold, &mut self.display);
    }

    pub fn use_calculated_cda(&mut self) {
        match self.analyzer.session().results().cda() {
            Some(cda) => self.cold_flow.cda = format!("{cda:e}"),
            None => report(&mut self.display, &AnalysisError::missing("please calculate CdA first")),
        }
    }

    pub fn use_calculated_mdot(&mut self) {
        match self.analyzer.session().results().mass_flow() {
            Some(mdot) => self.cold_flow.mdot = format!("{mdot}"),
            None => report(&mut self.display, &AnalysisError::missing("please calculate ṁ first")),
        }
    }

    // -----------------------------------------------------------------------
    // Venturi
    // -----------------------------------------------------------------------

    pub fn set_venturi_propellant(&mut self, propellant: Propellant) {
        self.venturi.propellant = propellant;
        let config = self.analyzer.config();
        let density = match propellant {
            Propellant::Fuel => config.fuel_density,
            Propellant::Oxidizer => config.oxidizer_density,
        };
        self.venturi.density = density.to_string();
    }

    pub fn plot_venturi(&mut self) {
        let (Some(p1), Some(p2)) = (
            self.venturi.p1_column.clone(),
            self.venturi.p2_column.clone(),
        ) else {
            report(&mut self.display, &AnalysisError::missing("select P1 and P2 columns"));
            return;
        };
        let form = &self.venturi;
        let parsed: Option<Vec<f64>> = [
            ("A1", &form.inlet_area),
            ("A2", &form.throat_area),
            ("Cd", &form.cd),
            ("Y", &form.expansion),
            ("density", &form.density),
        ]
        .into_iter()
        .map(|(name, text)| field(&mut self.display, name, text))
        .collect();
        let Some(parsed) = parsed else {
            return;
        };

        let propellant = self.venturi.propellant;
        let mut spec = self.analyzer.venturi_preset(propellant, parsed[0], parsed[1]);
        spec.cd = parsed[2];
        spec.expansion = parsed[3];
        spec.density = parsed[4];
        self.analyzer
            .plot_venturi(propellant, &p1, &p2, &spec, &mut self.display);
    }
}
