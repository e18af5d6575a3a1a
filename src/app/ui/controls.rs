use eframe::egui::{self, Color32, RichText, Sense, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::graph::{FilterColor, GraphStore};

use super::super::pane::Pane;
use super::super::render_utils::draw_unassigned_swatch;

const SEARCH_RESULTS: usize = 8;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

pub(in crate::app) fn search_nodes(
    store: &GraphStore,
    query: &str,
    limit: usize,
) -> Vec<(String, String)> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut matches = store
        .nodes()
        .filter_map(|node| {
            fuzzy_match_score(&matcher, &node.label, query)
                .map(|score| (score, node.id.clone(), node.label.clone()))
        })
        .collect::<Vec<_>>();
    matches.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.2.cmp(&b.2)));
    matches
        .into_iter()
        .take(limit)
        .map(|(_, id, label)| (id, label))
        .collect()
}

fn swatch_button(ui: &mut Ui, color: FilterColor) -> egui::Response {
    let (rect, response) = ui.allocate_exact_size(vec2(22.0, 22.0), Sense::click());
    match color {
        FilterColor::Unassigned => draw_unassigned_swatch(ui.painter(), rect),
        FilterColor::Assigned(color) => {
            ui.painter().rect_filled(rect, 11.0, color);
        }
    }
    response.on_hover_text("Pick a colour for users matching this filter")
}

fn picker(ui: &mut Ui, id: impl std::hash::Hash, label: &str, options: &[String], selected: &mut Option<String>) {
    ui.horizontal(|ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(id)
            .width(200.0)
            .selected_text(selected.as_deref().unwrap_or("None"))
            .show_ui(ui, |ui| {
                for option in options {
                    ui.selectable_value(selected, Some(option.clone()), option.as_str());
                }
            });
    });
}

impl Pane {
    pub(in crate::app) fn draw_toolbar(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            let busy = self.is_busy();
            let menu_label = if self.menu_open { "Close Menu" } else { "Fetch New Graph" };
            if ui
                .add_enabled(self.dataset().is_some(), egui::Button::new(menu_label))
                .clicked()
            {
                self.menu_open = !self.menu_open;
            }

            let mut overlay = self.overlay_active();
            let toggle = ui
                .add_enabled(
                    self.graph().is_some() && !busy,
                    egui::Checkbox::new(&mut overlay, "Louvain"),
                )
                .on_hover_text("Colour nodes by detected community");
            if toggle.clicked()
                && let Err(rejected) = self.toggle_communities()
            {
                self.error = Some(rejected.to_string());
            }

            if busy || self.is_loading_options() {
                ui.spinner();
            }

            if let Some(model) = self.committed_model() {
                ui.separator();
                ui.label(RichText::new(format!("model: {model}")).weak());
            }
            if let Some(store) = self.graph() {
                ui.label(
                    RichText::new(format!("{} nodes, {} edges", store.node_count(), store.edge_count()))
                        .weak(),
                );
            }
        });
    }

    pub(in crate::app) fn draw_filter_menu(&mut self, ui: &mut Ui) {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.label(RichText::new("Add/Remove Filters").strong());
            ui.add_space(4.0);

            ui.add_enabled_ui(!self.is_busy(), |ui| {
                picker(
                    ui,
                    (self.name, "category"),
                    "Filter category:",
                    &self.features,
                    &mut self.category,
                );
                ui.horizontal(|ui| {
                    ui.label("Filter query:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.query)
                            .hint_text("Value x or range x-y (inclusive)")
                            .desired_width(200.0),
                    );
                    if ui.button("Add Filter").clicked() {
                        self.add_filter();
                    }
                });
                picker(ui, (self.name, "model"), "Model:", &self.models, &mut self.model);

                ui.separator();
                self.draw_filter_list(ui);
                ui.separator();

                if ui.button("Fetch Graph").clicked()
                    && let Err(rejected) = self.fetch_graph()
                {
                    self.error = Some(rejected.to_string());
                }
            });
        });
    }

    fn draw_filter_list(&mut self, ui: &mut Ui) {
        if self.filters.is_empty() {
            ui.label(RichText::new("No filters currently applied.").weak());
            return;
        }

        let mut removed = None;
        let mut opened = None;
        egui::ScrollArea::vertical()
            .id_salt((self.name, "filters"))
            .max_height(160.0)
            .show(ui, |ui| {
                for entry in self.filters.entries() {
                    let key = entry.key();
                    ui.horizontal(|ui| {
                        ui.label(format!("{}: {}", entry.category, entry.query));
                        if swatch_button(ui, entry.color).clicked() {
                            opened = Some(key.clone());
                        }
                        if ui.small_button("Remove").clicked() {
                            removed = Some(key.clone());
                        }
                    });
                }
            });

        if let Some(key) = opened {
            self.palette.open(&key);
        }
        if let Some(key) = removed {
            self.remove_filter(&key);
        }

        let Some(target) = self.palette.target.clone() else {
            return;
        };
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("Colour for {target}")).small());
            if ui.small_button("Done").clicked() {
                self.palette.close();
            }
        });
        if let Some(pick) = self.palette.show(ui) {
            self.assign_color(&target, pick.color);
            if pick.close {
                self.palette.close();
            }
        }
    }

    pub(in crate::app) fn draw_search(&mut self, ui: &mut Ui) {
        if self.graph.is_none() {
            return;
        }

        ui.horizontal(|ui| {
            ui.label("Search");
            ui.add(
                egui::TextEdit::singleline(&mut self.search)
                    .hint_text("node label")
                    .desired_width(220.0),
            );
        });

        let results = self
            .graph
            .as_ref()
            .map(|store| search_nodes(store, &self.search, SEARCH_RESULTS))
            .unwrap_or_default();
        let mut chosen = None;
        for (id, label) in &results {
            if ui
                .selectable_label(false, RichText::new(label).color(Color32::from_gray(220)))
                .on_hover_text(id.as_str())
                .clicked()
            {
                chosen = Some(id.clone());
            }
        }

        if let Some(id) = chosen {
            self.search.clear();
            self.focus_node(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeKind, RawGraph};

    fn labelled(id: &str, label: &str) -> Node {
        let mut node = Node::new(id, NodeKind::Item);
        node.label = label.to_owned();
        node
    }

    #[test]
    fn search_ranks_label_matches() {
        let store = GraphStore::from_raw(RawGraph {
            nodes: vec![
                labelled("item-1", "Toy Story (1995)"),
                labelled("item-2", "GoldenEye (1995)"),
                labelled("item-3", "Four Rooms (1995)"),
            ],
            edges: Vec::new(),
        });

        let results = search_nodes(&store, "toy", 8);
        assert_eq!(results.first().map(|(id, _)| id.as_str()), Some("item-1"));
        assert!(search_nodes(&store, "   ", 8).is_empty());
        assert_eq!(search_nodes(&store, "1995", 2).len(), 2);
    }
}
