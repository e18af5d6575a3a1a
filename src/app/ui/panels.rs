use eframe::egui::{self, Color32, RichText, Ui};

use super::super::canvas::{CanvasClick, draw_graph};
use super::super::pane::Pane;

impl Pane {
    pub(in crate::app) fn show(&mut self, ui: &mut Ui) {
        self.draw_toolbar(ui);
        if self.menu_open {
            self.draw_filter_menu(ui);
        }

        if let Some(message) = self.error.clone() {
            ui.horizontal_wrapped(|ui| {
                ui.label(RichText::new(message).color(Color32::from_rgb(240, 110, 100)));
                if ui.small_button("Dismiss").clicked() {
                    self.error = None;
                }
            });
        }

        self.draw_search(ui);
        self.draw_attributes(ui);
        ui.separator();

        let Some(store) = self.graph.as_ref() else {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() * 0.4);
                if self.is_busy() {
                    ui.heading("Loading graph...");
                    ui.add_space(8.0);
                    ui.spinner();
                } else {
                    ui.heading("Load a dataset to get started");
                }
            });
            return;
        };

        if !self.selection.is_idle() {
            ui.label(RichText::new("Click the background to clear the selection").small().weak());
        }
        let click = draw_graph(ui, store, &self.selection, &mut self.camera);
        match click {
            CanvasClick::Node(id) => self.click_node(&id),
            CanvasClick::Stage => self.click_stage(),
            CanvasClick::None => {}
        }

        if self.is_busy() {
            egui::Area::new(egui::Id::new((self.name, "busy")))
                .fixed_pos(ui.min_rect().left_top() + egui::vec2(12.0, 12.0))
                .show(ui.ctx(), |ui| {
                    ui.spinner();
                });
        }
    }
}
