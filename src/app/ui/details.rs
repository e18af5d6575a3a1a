use eframe::egui::{self, RichText, Ui};

use super::super::pane::Pane;

impl Pane {
    pub(in crate::app) fn draw_attributes(&mut self, ui: &mut Ui) {
        let (Some(id), Some(attributes)) = (self.selection.selected_id(), self.selection.attributes())
        else {
            return;
        };
        if attributes.is_empty() {
            return;
        }

        egui::CollapsingHeader::new(RichText::new(format!("Attributes of {id}")).strong())
            .id_salt((self.name, "attributes"))
            .default_open(true)
            .show(ui, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt((self.name, "attributes_scroll"))
                    .max_height(200.0)
                    .auto_shrink([false, true])
                    .show(ui, |ui| {
                        for (key, value) in attributes {
                            egui::CollapsingHeader::new(key.as_str())
                                .id_salt((self.name, key.as_str()))
                                .show(ui, |ui| {
                                    ui.add(egui::Label::new(value.to_string()).wrap());
                                });
                        }
                    });
            });

        if let Some(history) = self.interaction_history() {
            ui.label(RichText::new(format!("History: {history}")).small().weak())
                .on_hover_text("Interaction history of the selected user");
        }
    }
}
