use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use rusty_hotfire::presentation::NoticeLevel;

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Plot colours
// ---------------------------------------------------------------------------

/// `n` distinct series colours, starting from blue.
pub fn series_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| {
            let hue = (215.0 + (i as f32 / n.max(1) as f32) * 360.0) % 360.0;
            hsl_to_color32(hue, 0.75, 0.55)
        })
        .collect()
}

/// Reference lines: green for the first (target), orange shades after.
pub fn reference_color(index: usize) -> Color32 {
    match index {
        0 => hsl_to_color32(120.0, 0.9, 0.45),
        i => hsl_to_color32(35.0 + 8.0 * i as f32, 0.95, 0.55),
    }
}

pub fn selection_color() -> Color32 {
    hsl_to_color32(0.0, 0.85, 0.55)
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

pub fn notice_color(level: NoticeLevel) -> Color32 {
    match level {
        NoticeLevel::Success => hsl_to_color32(150.0, 0.7, 0.45),
        NoticeLevel::Error => hsl_to_color32(0.0, 0.75, 0.55),
        NoticeLevel::Warning => hsl_to_color32(40.0, 0.9, 0.5),
        NoticeLevel::Info => hsl_to_color32(205.0, 0.7, 0.55),
    }
}
