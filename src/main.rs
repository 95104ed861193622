mod app;
mod color;
mod state;
mod ui;

use app::HotfireApp;
use eframe::egui;
use rusty_hotfire::config::AnalyzerConfig;

fn main() -> eframe::Result {
    env_logger::init();

    let config = AnalyzerConfig::from_env();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Hotfire – Static Fire Analyzer",
        options,
        Box::new(|_cc| Ok(Box::new(HotfireApp::new(config)))),
    )
}
