use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{HLine, Legend, Line, LineStyle, Plot, PlotPoints, Points};

use rusty_hotfire::analysis::metrics::format_value;
use rusty_hotfire::analysis::series;

use crate::color::{reference_color, selection_color, series_palette};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Chart (central panel)
// ---------------------------------------------------------------------------

/// Index of the x value closest to `x`.
fn nearest_index(xs: &[f64], x: f64) -> Option<usize> {
    xs.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - x).abs().total_cmp(&(*b - x).abs()))
        .map(|(i, _)| i)
}

/// Render the current chart. Clicking picks points; two picks show the
/// average of each displayed series between them.
pub fn chart(ui: &mut Ui, state: &mut AppState) {
    let Some(data) = &state.display.plot else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file and pick columns to start  (File → Open…)");
        });
        return;
    };

    let smoothed: Vec<Vec<f64>> = data
        .lines
        .iter()
        .map(|l| series::smooth(&l.y, state.smoothing))
        .collect();
    let colors = series_palette(data.lines.len());
    let picks = state.display.picks.clone();

    ui.horizontal(|ui: &mut Ui| {
        ui.heading(data.title.as_str());
        if state.smoothing > 1 {
            ui.label(RichText::new(format!("smoothing {}", state.smoothing)).color(Color32::GRAY));
        }
    });

    if let [a, b] = picks[..] {
        let (x0, x1) = (data.x[a.min(b)], data.x[a.max(b)]);
        for (line, y) in data.lines.iter().zip(&smoothed) {
            let avg = series::mean_between(y, a, b);
            ui.label(format!(
                "Average {} between t = {x0:.3} s and t = {x1:.3} s: {} {}",
                line.name,
                format_value(avg, 3),
                line.unit.as_deref().unwrap_or("")
            ));
        }
    } else {
        ui.label(RichText::new("Click two points to average between them").small());
    }

    let response = Plot::new("telemetry_plot")
        .legend(Legend::default())
        .x_axis_label(data.x_label.as_str())
        .y_axis_label(data.y_label.as_str())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for ((line, y), color) in data.lines.iter().zip(&smoothed).zip(&colors) {
                let points: PlotPoints = data
                    .x
                    .iter()
                    .zip(y.iter())
                    .map(|(&xi, &yi)| [xi, yi])
                    .collect();
                plot_ui.line(Line::new(points).name(&line.name).color(*color).width(1.5));
            }

            for (i, reference) in data.references.iter().enumerate() {
                plot_ui.hline(
                    HLine::new(reference.value)
                        .name(&reference.label)
                        .color(reference_color(i))
                        .style(LineStyle::dashed_loose()),
                );
            }

            if let Some(y) = smoothed.first() {
                let marked: PlotPoints = picks
                    .iter()
                    .filter_map(|&i| Some([*data.x.get(i)?, *y.get(i)?]))
                    .collect();
                plot_ui.points(Points::new(marked).radius(5.0).color(selection_color()));
            }

            plot_ui.pointer_coordinate()
        });

    if response.response.clicked() {
        if let Some(idx) = response.inner.and_then(|p| nearest_index(&data.x, p.x)) {
            let picks = &mut state.display.picks;
            if picks.len() >= 2 {
                picks.clear();
            }
            picks.push(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_index_picks_closest_sample() {
        let xs = [0.0, 0.5, 1.0, 1.5];
        assert_eq!(nearest_index(&xs, 0.7), Some(1));
        assert_eq!(nearest_index(&xs, 9.0), Some(3));
        assert_eq!(nearest_index(&[], 1.0), None);
    }
}
