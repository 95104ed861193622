use eframe::egui;
use rusty_hotfire::config::AnalyzerConfig;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct HotfireApp {
    pub state: AppState,
}

impl HotfireApp {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            state: AppState::new(config),
        }
    }
}

impl eframe::App for HotfireApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Bottom panel: metrics and notices ----
        egui::TopBottomPanel::bottom("results_panel")
            .resizable(true)
            .default_height(180.0)
            .show(ctx, |ui| {
                panels::results_panel(ui, &mut self.state);
            });

        // ---- Left side panel: bindings, window, calculators ----
        egui::SidePanel::left("tools_panel")
            .default_width(320.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: current chart ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::chart(ui, &mut self.state);
        });

        // ---- Value prompt dialog ----
        panels::prompt_window(ctx, &mut self.state);
    }
}
