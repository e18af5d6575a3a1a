use eframe::egui::{self, Color32, Sense, Stroke, Ui, vec2};

use crate::graph::{PRESET_COLORS, hsl_to_color, hue_of, parse_hex_color, to_hex};

pub(in crate::app) struct PaletteState {
    pub(in crate::app) target: Option<String>,
    custom_hex: String,
    hue: f32,
}

impl Default for PaletteState {
    fn default() -> Self {
        Self {
            target: None,
            custom_hex: to_hex(hsl_to_color(0.0, 100.0, 50.0)),
            hue: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct PalettePick {
    pub(in crate::app) color: Color32,
    pub(in crate::app) close: bool,
}

impl PaletteState {
    pub(in crate::app) fn open(&mut self, key: &str) {
        self.target = Some(key.to_owned());
    }

    pub(in crate::app) fn close(&mut self) {
        self.target = None;
    }

    fn hex_edited(&mut self) -> Option<Color32> {
        let color = parse_hex_color(&self.custom_hex)?;
        self.hue = hue_of(color);
        Some(color)
    }

    fn hue_moved(&mut self) -> Color32 {
        let color = hsl_to_color(self.hue, 100.0, 50.0);
        self.custom_hex = to_hex(color);
        color
    }

    pub(in crate::app) fn show(&mut self, ui: &mut Ui) -> Option<PalettePick> {
        let mut pick = None;

        ui.horizontal(|ui| {
            for color in PRESET_COLORS {
                let (rect, response) = ui.allocate_exact_size(vec2(22.0, 22.0), Sense::click());
                ui.painter().circle_filled(rect.center(), 10.0, color);
                ui.painter()
                    .circle_stroke(rect.center(), 10.0, Stroke::new(1.0, Color32::from_gray(204)));
                if response.on_hover_text(to_hex(color)).clicked() {
                    pick = Some(PalettePick { color, close: true });
                }
            }
        });

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.label("Custom");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.custom_hex)
                    .desired_width(80.0)
                    .char_limit(7),
            );
            if response.changed()
                && let Some(color) = self.hex_edited()
            {
                pick = Some(PalettePick {
                    color,
                    close: false,
                });
            }

            let (rect, _) = ui.allocate_exact_size(vec2(18.0, 18.0), Sense::hover());
            let preview = parse_hex_color(&self.custom_hex).unwrap_or(Color32::TRANSPARENT);
            ui.painter().rect_filled(rect, 3.0, preview);
        });

        let hue = ui.add(egui::Slider::new(&mut self.hue, 0.0..=360.0).text("Hue"));
        if hue.changed() {
            pick = Some(PalettePick {
                color: self.hue_moved(),
                close: false,
            });
        }

        pick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_hex_is_ignored() {
        let mut palette = PaletteState::default();
        palette.hue = 120.0;
        for text in ["#12345", "123456", "#GG0000", "#1234567"] {
            palette.custom_hex = text.to_owned();
            assert_eq!(palette.hex_edited(), None, "{text}");
        }
        assert_eq!(palette.hue, 120.0);
    }

    #[test]
    fn valid_hex_moves_the_hue() {
        let mut palette = PaletteState::default();
        palette.custom_hex = "#00FF00".to_owned();
        assert_eq!(palette.hex_edited(), Some(Color32::from_rgb(0, 255, 0)));
        assert!((palette.hue - 120.0).abs() < 0.5);
    }

    #[test]
    fn hue_slider_writes_full_saturation_colours() {
        let mut palette = PaletteState::default();
        palette.hue = 240.0;
        assert_eq!(palette.hue_moved(), Color32::from_rgb(0, 0, 255));
        assert_eq!(palette.custom_hex.to_ascii_lowercase(), "#0000ff");
    }
}
