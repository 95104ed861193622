use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use rusty_hotfire::controller::Propellant;
use rusty_hotfire::session::{Phase, SeriesSource};

use crate::color::notice_color;
use crate::state::{AppState, PromptedAction};

// ---------------------------------------------------------------------------
// Small widgets
// ---------------------------------------------------------------------------

/// Column picker; `none_label` adds an empty choice.
fn column_combo(
    ui: &mut Ui,
    id: &str,
    label: &str,
    columns: &[String],
    selected: &mut Option<String>,
    none_label: Option<&str>,
) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        let text = selected
            .clone()
            .or_else(|| none_label.map(str::to_string))
            .unwrap_or_default();
        egui::ComboBox::from_id_salt(id)
            .selected_text(text)
            .width(180.0)
            .show_ui(ui, |ui: &mut Ui| {
                if let Some(none) = none_label {
                    ui.selectable_value(selected, None, none);
                }
                for col in columns {
                    ui.selectable_value(selected, Some(col.clone()), col.as_str());
                }
            });
    });
}

fn text_field(ui: &mut Ui, label: &str, value: &mut String) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        ui.add(egui::TextEdit::singleline(value).desired_width(90.0));
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let has_plot = state.display.plot.is_some();
            if ui
                .add_enabled(has_plot, egui::Button::new("Export plot as CSV…"))
                .clicked()
            {
                state.export_plot();
                ui.close_menu();
            }
        });

        ui.separator();

        let session = state.analyzer.session();
        match (state.analyzer.source_name(), session.table()) {
            (Some(name), Some(table)) => {
                ui.label(format!(
                    "{name}: {} rows, {} columns",
                    table.len(),
                    table.columns().len()
                ));
            }
            _ => {
                ui.label("No file loaded");
            }
        }

        ui.separator();

        let phase = match session.phase() {
            Phase::Empty => "select columns",
            Phase::ColumnsBound => "columns bound",
            Phase::WindowSet => "window set",
            Phase::MetricsComputed => "metrics computed",
        };
        ui.label(RichText::new(phase).color(Color32::GRAY));
    });
}

// ---------------------------------------------------------------------------
// Left side panel
// ---------------------------------------------------------------------------

pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    if state.analyzer.session().table().is_none() {
        ui.vertical_centered(|ui: &mut Ui| {
            ui.add_space(40.0);
            ui.label(RichText::new("No telemetry loaded").size(16.0));
            ui.label(RichText::new("File → Open… (CSV, JSON or Parquet)").small());
        });
        return;
    }

    let columns = state.columns();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            egui::CollapsingHeader::new(RichText::new("Columns").strong())
                .default_open(true)
                .show(ui, |ui: &mut Ui| bindings_section(ui, state, &columns));

            let bound = state.analyzer.session().phase() != Phase::Empty;
            ui.add_enabled_ui(bound, |ui: &mut Ui| {
                egui::CollapsingHeader::new(RichText::new("Burn Window").strong())
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| window_section(ui, state));

                egui::CollapsingHeader::new(RichText::new("Plots").strong())
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| plots_section(ui, state));

                egui::CollapsingHeader::new(RichText::new("Custom Plot").strong())
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| custom_section(ui, state, &columns));

                egui::CollapsingHeader::new(RichText::new("Cold Flow (CdA)").strong())
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| cold_flow_section(ui, state, &columns));

                egui::CollapsingHeader::new(RichText::new("Venturi").strong())
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| venturi_section(ui, state, &columns));
            });
        });
}

fn bindings_section(ui: &mut Ui, state: &mut AppState, columns: &[String]) {
    column_combo(ui, "bind_time", "Time", columns, &mut state.draft.time, None);

    ui.label("Thrust channels");
    for col in columns {
        let mut checked = state.draft.thrust.contains(col);
        if ui.checkbox(&mut checked, col.as_str()).changed() {
            state.draft.toggle_thrust(col);
        }
    }

    column_combo(
        ui,
        "bind_chamber",
        "Chamber P",
        columns,
        &mut state.draft.chamber_pressure,
        Some("(none)"),
    );
    column_combo(
        ui,
        "bind_fuel",
        "Fuel weight",
        columns,
        &mut state.draft.fuel_weight,
        Some("(none)"),
    );
    column_combo(
        ui,
        "bind_ox",
        "Ox weight",
        columns,
        &mut state.draft.oxidizer_weight,
        Some("(none)"),
    );

    if ui.button("Apply columns").clicked() {
        state.apply_bindings();
    }
}

fn window_section(ui: &mut Ui, state: &mut AppState) {
    ui.checkbox(&mut state.window_form.use_range, "Custom time range");
    if state.window_form.use_range {
        text_field(ui, "Start (s)", &mut state.window_form.start);
        text_field(ui, "End (s)", &mut state.window_form.end);
    } else if let Some(target) = state.analyzer.session().last_target_thrust() {
        ui.label(format!("Last target: {target} lbf"));
    }

    ui.horizontal(|ui: &mut Ui| {
        if ui.button("Analyze").clicked() {
            state.run_window();
        }
        if ui.button("Test Data").clicked() {
            state.plot_test_data();
        }
    });

    ui.separator();

    let config = state.analyzer.config();
    let max_downsample = config.max_downsample;
    let max_smoothing = config.max_smoothing;

    let mut view_changed = false;
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Extra data");
        view_changed |= ui
            .add(egui::Slider::new(&mut state.margin_slider, 0..=100).show_value(false))
            .changed();
        ui.label(format!("{:.1}%", state.margin_percent()));
    });
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Downsample");
        view_changed |= ui
            .add(egui::DragValue::new(&mut state.downsample).range(1..=max_downsample))
            .changed();
    });
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Smoothing");
        ui.add(egui::Slider::new(&mut state.smoothing, 1..=max_smoothing));
    });
    if view_changed {
        state.apply_view();
    }
}

fn plots_section(ui: &mut Ui, state: &mut AppState) {
    let bindings = state.analyzer.session().bindings().clone();

    ui.horizontal_wrapped(|ui: &mut Ui| {
        if ui.button("Thrust").clicked() {
            state.plot(SeriesSource::TotalThrust);
        }
        if ui
            .add_enabled(bindings.chamber_pressure.is_some(), egui::Button::new("Chamber P"))
            .clicked()
        {
            state.plot(SeriesSource::ChamberPressure);
        }
        let has_props = bindings.fuel_weight.is_some() && bindings.oxidizer_weight.is_some();
        if ui
            .add_enabled(has_props, egui::Button::new("O/F Ratio"))
            .clicked()
        {
            state.plot(SeriesSource::OfRatio);
        }
        if let Some(fuel) = &bindings.fuel_weight {
            if ui.button("Fuel weight").clicked() {
                state.plot(SeriesSource::Raw(fuel.clone()));
            }
        }
        if let Some(ox) = &bindings.oxidizer_weight {
            if ui.button("Ox weight").clicked() {
                state.plot(SeriesSource::Raw(ox.clone()));
            }
        }
    });

    ui.horizontal_wrapped(|ui: &mut Ui| {
        if ui.button("ISP").clicked() {
            state.start_prompt(PromptedAction::Isp);
        }
        if ui.button("Ve").clicked() {
            state.start_prompt(PromptedAction::ExhaustVelocity);
        }
        if ui
            .add_enabled(bindings.chamber_pressure.is_some(), egui::Button::new("c*"))
            .clicked()
        {
            state.start_prompt(PromptedAction::CStar);
        }
    });
}

fn custom_section(ui: &mut Ui, state: &mut AppState, columns: &[String]) {
    let generated = state.analyzer.session().bindings().generated_sources();
    let sources = generated
        .into_iter()
        .chain(columns.iter().cloned().map(SeriesSource::Raw));

    for source in sources {
        let mut checked = state.custom.selected.contains(&source);
        if ui.checkbox(&mut checked, source.to_string()).changed() {
            if checked {
                state.custom.selected.insert(source);
            } else {
                state.custom.selected.remove(&source);
            }
        }
    }

    ui.separator();
    ui.label("Constant lines");
    let mut remove = None;
    for (i, line) in state.custom.constants.iter().enumerate() {
        ui.horizontal(|ui: &mut Ui| {
            ui.label(format!("{}: {}", line.label, line.value));
            if ui.small_button("✕").clicked() {
                remove = Some(i);
            }
        });
    }
    if let Some(i) = remove {
        state.custom.constants.remove(i);
    }
    ui.horizontal(|ui: &mut Ui| {
        ui.add(egui::TextEdit::singleline(&mut state.custom.new_label).hint_text("label").desired_width(80.0));
        ui.add(egui::TextEdit::singleline(&mut state.custom.new_value).hint_text("value").desired_width(60.0));
        if ui.small_button("Add").clicked() {
            state.add_constant();
        }
    });

    if ui.button("Plot selected").clicked() {
        state.plot_custom();
    }
}

fn cold_flow_section(ui: &mut Ui, state: &mut AppState, columns: &[String]) {
    let form = &mut state.cold_flow;
    column_combo(ui, "cf_weight", "Weight", columns, &mut form.weight_column, None);
    column_combo(ui, "cf_high", "P_high", columns, &mut form.high_column, Some("(manual)"));
    column_combo(ui, "cf_low", "P_low", columns, &mut form.low_column, Some("Ambient"));
    text_field(ui, "Start (s)", &mut form.start);
    text_field(ui, "End (s)", &mut form.end);

    if ui.button("Calculate ṁ").clicked() {
        state.compute_mass_flow();
    }

    ui.separator();
    let form = &mut state.cold_flow;
    text_field(ui, "P_high (psi)", &mut form.p_high);
    text_field(ui, "P_low (psi)", &mut form.p_low);
    text_field(ui, "ρ (kg/m³)", &mut form.density);
    if ui.button("Calculate CdA").clicked() {
        state.compute_cda();
    }

    ui.separator();
    text_field(ui, "Manifold (psi)", &mut state.cold_flow.manifold);
    ui.horizontal(|ui: &mut Ui| {
        text_field(ui, "CdA (m²)", &mut state.cold_flow.cda);
        if ui.small_button("use calculated").clicked() {
            state.use_calculated_cda();
        }
    });
    ui.horizontal(|ui: &mut Ui| {
        text_field(ui, "ṁ (kg/s)", &mut state.cold_flow.mdot);
        if ui.small_button("use calculated").clicked() {
            state.use_calculated_mdot();
        }
    });
    if ui.button("Calculate set pressure").clicked() {
        state.compute_set_pressure();
    }
}

fn venturi_section(ui: &mut Ui, state: &mut AppState, columns: &[String]) {
    ui.horizontal(|ui: &mut Ui| {
        for propellant in [Propellant::Fuel, Propellant::Oxidizer] {
            if ui
                .selectable_label(state.venturi.propellant == propellant, propellant.label())
                .clicked()
            {
                state.set_venturi_propellant(propellant);
            }
        }
    });

    let form = &mut state.venturi;
    column_combo(ui, "v_p1", "P1", columns, &mut form.p1_column, None);
    column_combo(ui, "v_p2", "P2", columns, &mut form.p2_column, None);
    text_field(ui, "A1 (in²)", &mut form.inlet_area);
    text_field(ui, "A2 (in²)", &mut form.throat_area);
    text_field(ui, "Cd", &mut form.cd);
    text_field(ui, "Y", &mut form.expansion);
    text_field(ui, "ρ (kg/m³)", &mut form.density);

    if ui.button("Plot venturi ṁ").clicked() {
        state.plot_venturi();
    }
}

// ---------------------------------------------------------------------------
// Bottom panel: metrics table and notices
// ---------------------------------------------------------------------------

pub fn results_panel(ui: &mut Ui, state: &mut AppState) {
    ui.columns(2, |cols: &mut [Ui]| {
        cols[0].strong("Metrics");
        if state.display.metrics.is_empty() {
            cols[0].label(RichText::new("Nothing computed yet").color(Color32::GRAY));
        } else {
            TableBuilder::new(&mut cols[0])
                .striped(true)
                .column(Column::auto().at_least(160.0))
                .column(Column::remainder())
                .body(|mut body| {
                    for (name, value) in &state.display.metrics {
                        body.row(18.0, |mut row| {
                            row.col(|ui: &mut Ui| {
                                ui.label(name.as_str());
                            });
                            row.col(|ui: &mut Ui| {
                                ui.monospace(value.as_str());
                            });
                        });
                    }
                });
        }

        cols[1].horizontal(|ui: &mut Ui| {
            ui.strong("Messages");
            if ui.small_button("Clear").clicked() {
                state.display.notices.clear();
            }
        });
        ScrollArea::vertical()
            .id_salt("notices")
            .show(&mut cols[1], |ui: &mut Ui| {
                for notice in &state.display.notices {
                    ui.label(
                        RichText::new(format!("{} {}", notice.level, notice.message))
                            .color(notice_color(notice.level)),
                    );
                }
            });
    });
}

// ---------------------------------------------------------------------------
// Prompt dialog
// ---------------------------------------------------------------------------

pub fn prompt_window(ctx: &egui::Context, state: &mut AppState) {
    let Some(form) = &mut state.prompt else {
        return;
    };

    let mut confirm = false;
    let mut cancel = false;
    egui::Window::new(form.action.title())
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .order(egui::Order::Foreground)
        .show(ctx, |ui: &mut Ui| {
            for (label, input) in form.action.fields().iter().zip(form.inputs.iter_mut()) {
                text_field(ui, label, input);
            }
            ui.horizontal(|ui: &mut Ui| {
                cancel = ui.button("Cancel").clicked();
                confirm = ui.button("Confirm").clicked();
            });
            if ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                confirm = true;
            }
        });

    if cancel {
        state.cancel_prompt();
    } else if confirm {
        state.confirm_prompt();
    }
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open test data")
        .add_filter("Supported files", &["csv", "txt", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv", "txt"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open_file(&path);
    }
}
