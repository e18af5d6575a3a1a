use eframe::egui::{self, Context, RichText, Ui};
use log::{error, info};

use crate::api::{ApiClient, MetricRecord};
use crate::graph::{
    ComparisonGraph, ComparisonGraphBuilder, ComparisonInput, ComparisonKey, MAX_K, MIN_K,
    SelectionState, clamp_k,
};
use crate::util::format_significant;

use super::canvas::{CanvasClick, draw_graph};
use super::render_utils::Camera;
use super::request::RequestSlot;

const ASPECT_TOLERANCE: f32 = 0.01;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct ComparisonSubject {
    pub(super) dataset: String,
    pub(super) model1: String,
    pub(super) model2: String,
    pub(super) user1: String,
    pub(super) user2: String,
}

impl ComparisonSubject {
    fn key(&self, k: usize) -> ComparisonKey {
        ComparisonKey {
            dataset: self.dataset.clone(),
            model1: self.model1.clone(),
            model2: self.model2.clone(),
            k,
            user1: self.user1.clone(),
            user2: self.user2.clone(),
        }
    }
}

struct MetricsReport {
    similarity: Result<MetricRecord, String>,
    graph: Result<MetricRecord, String>,
}

pub(super) struct ComparisonView {
    api: ApiClient,
    open: bool,
    k: usize,
    subject: Option<ComparisonSubject>,
    requested: Option<ComparisonKey>,
    input_request: RequestSlot<(ComparisonKey, ComparisonInput)>,
    metrics_request: RequestSlot<MetricsReport>,
    input: Option<(ComparisonKey, ComparisonInput)>,
    graph: Option<ComparisonGraph>,
    built_aspect: Option<f32>,
    metrics: Option<MetricsReport>,
    camera: Camera,
    selection: SelectionState,
    error: Option<String>,
}

impl ComparisonView {
    pub(super) fn new(api: ApiClient, k: usize) -> Self {
        Self {
            api,
            open: false,
            k: clamp_k(k),
            subject: None,
            requested: None,
            input_request: RequestSlot::new("comparison input"),
            metrics_request: RequestSlot::new("comparison metrics"),
            input: None,
            graph: None,
            built_aspect: None,
            metrics: None,
            camera: Camera::default(),
            selection: SelectionState::default(),
            error: None,
        }
    }

    pub(super) fn is_open(&self) -> bool {
        self.open
    }

    pub(super) fn is_busy(&self) -> bool {
        self.input_request.is_pending() || self.metrics_request.is_pending()
    }

    fn key(&self) -> Option<ComparisonKey> {
        self.subject.as_ref().map(|subject| subject.key(self.k))
    }

    pub(super) fn open_for(&mut self, subject: ComparisonSubject) {
        if self.subject.as_ref() != Some(&subject) {
            self.input = None;
            self.graph = None;
            self.built_aspect = None;
            self.metrics = None;
            self.selection.reset();
        }
        self.subject = Some(subject);
        self.open = true;
        self.refresh();
    }

    pub(super) fn follow(&mut self, subject: Option<ComparisonSubject>) {
        if !self.open {
            return;
        }
        match subject {
            Some(subject) if self.subject.as_ref() != Some(&subject) => self.open_for(subject),
            Some(_) => {}
            None => {
                info!("comparison closed, a pane has no selected user");
                self.close();
            }
        }
    }

    pub(super) fn close(&mut self) {
        self.open = false;
        self.subject = None;
        self.requested = None;
        self.input_request.cancel();
        self.metrics_request.cancel();
    }

    fn set_k(&mut self, k: usize) {
        let k = clamp_k(k);
        if k != self.k {
            self.k = k;
            self.refresh();
        }
    }

    fn refresh(&mut self) {
        let Some(key) = self.key() else {
            return;
        };
        if self.requested.as_ref() == Some(&key) {
            return;
        }

        info!(
            "comparing {} ({}) with {} ({}) on {}, k = {}",
            key.user1, key.model1, key.user2, key.model2, key.dataset, key.k
        );
        self.requested = Some(key.clone());
        self.error = None;
        self.metrics = None;

        let api = self.api.clone();
        let request = key.clone();
        self.input_request.issue(move || {
            let key = request;
            let input = ComparisonInput {
                recs1: api.topk_for_user(&key.dataset, &key.model1, key.k, &key.user1)?,
                recs2: api.topk_for_user(&key.dataset, &key.model2, key.k, &key.user2)?,
                hist1: api.interaction_history(&key.dataset, key.k, &key.user1)?,
                hist2: api.interaction_history(&key.dataset, key.k, &key.user2)?,
            };
            Ok((key, input))
        });

        let api = self.api.clone();
        self.metrics_request.issue(move || {
            let users = (key.user1.as_str(), key.user2.as_str());
            let similarity = api
                .similarity_metrics(&key.dataset, (&key.model1, &key.model2), key.k, users)
                .map_err(|e| format!("{:#}", anyhow::Error::new(e)));
            let graph = api
                .graph_similarity_metrics(&key.dataset, users)
                .map_err(|e| format!("{:#}", anyhow::Error::new(e)));
            Ok(MetricsReport { similarity, graph })
        });
    }

    pub(super) fn poll(&mut self) -> bool {
        let mut changed = false;

        if let Some(result) = self.input_request.poll() {
            changed = true;
            match result {
                Ok(fetched) => {
                    self.input = Some(fetched);
                    self.graph = None;
                    self.built_aspect = None;
                    self.selection.reset();
                }
                Err(message) => {
                    error!("comparison fetch failed: {message}");
                    self.requested = None;
                    self.input = None;
                    self.graph = None;
                    self.built_aspect = None;
                    self.selection.reset();
                    self.error = Some(message);
                }
            }
        }

        if let Some(result) = self.metrics_request.poll() {
            changed = true;
            match result {
                Ok(report) => self.metrics = Some(report),
                Err(message) => error!("comparison metrics failed: {message}"),
            }
        }

        changed
    }

    fn needs_rebuild(&self, aspect: f32) -> bool {
        if self.input.is_none() {
            return false;
        }
        match (self.graph.as_ref(), self.built_aspect) {
            (Some(_), Some(built)) => (aspect - built).abs() > built * ASPECT_TOLERANCE,
            _ => true,
        }
    }

    fn rebuild(&mut self, aspect: f32) {
        let Some((key, input)) = self.input.as_ref() else {
            return;
        };
        let graph = ComparisonGraphBuilder::new(aspect).build(input, key.k);
        self.graph = Some(graph);
        self.built_aspect = Some(aspect);
        self.selection.reset();
        self.camera.request_fit();
    }

    pub(super) fn show(&mut self, ctx: &Context) {
        let mut open = self.open;
        egui::Window::new("User comparison")
            .open(&mut open)
            .default_size([960.0, 680.0])
            .resizable(true)
            .show(ctx, |ui| self.draw(ui));

        if !open {
            self.close();
        }
    }

    fn draw(&mut self, ui: &mut Ui) {
        if let Some(subject) = &self.subject {
            ui.label(
                RichText::new(format!(
                    "{} ({}) vs {} ({})",
                    subject.user1, subject.model1, subject.user2, subject.model2
                ))
                .strong(),
            );
        }

        let mut k = self.k;
        if ui
            .add(egui::Slider::new(&mut k, MIN_K..=MAX_K).text("k"))
            .changed()
        {
            self.set_k(k);
        }

        if let Some(message) = self.error.clone() {
            ui.horizontal_wrapped(|ui| {
                ui.colored_label(egui::Color32::from_rgb(240, 110, 100), message);
                if ui.small_button("Retry").clicked() {
                    self.refresh();
                }
            });
        }
        self.draw_metrics(ui);
        ui.separator();

        let size = ui.available_size();
        let aspect = size.x / size.y.max(1.0);
        if self.needs_rebuild(aspect) {
            self.rebuild(aspect);
        }

        let Some(graph) = self.graph.as_ref() else {
            if self.input_request.is_pending() {
                ui.vertical_centered(|ui| {
                    ui.add_space(40.0);
                    ui.spinner();
                });
            }
            return;
        };

        ui.label(
            RichText::new(format!(
                "{} shared recommendations, {} history matches",
                graph.match_edges, graph.history_edges
            ))
            .weak(),
        );

        match draw_graph(ui, &graph.store, &self.selection, &mut self.camera) {
            CanvasClick::Node(id) => {
                self.selection.click_node(&graph.store, &id);
            }
            CanvasClick::Stage => {
                self.selection.click_stage();
            }
            CanvasClick::None => {}
        }
    }

    fn draw_metrics(&self, ui: &mut Ui) {
        let Some(report) = &self.metrics else {
            if self.metrics_request.is_pending() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Computing similarity metrics...");
                });
            }
            return;
        };

        ui.columns(2, |columns| {
            metric_grid(&mut columns[0], "Recommendation similarity", &report.similarity);
            metric_grid(&mut columns[1], "Interaction graph similarity", &report.graph);
        });
    }
}

fn metric_grid(ui: &mut Ui, title: &str, record: &Result<MetricRecord, String>) {
    ui.label(RichText::new(title).strong());
    match record {
        Ok(record) => {
            egui::Grid::new(title).striped(true).show(ui, |ui| {
                for (name, value) in record {
                    ui.label(name.as_str());
                    ui.monospace(format_significant(*value, 6));
                    ui.end_row();
                }
            });
        }
        Err(message) => {
            ui.label(RichText::new(message).weak());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::graph::Recommendation;

    fn subject() -> ComparisonSubject {
        ComparisonSubject {
            dataset: "ml-100k".to_owned(),
            model1: "lightgcn".to_owned(),
            model2: "bpr".to_owned(),
            user1: "user-1".to_owned(),
            user2: "user-2".to_owned(),
        }
    }

    fn offline_view() -> ComparisonView {
        let api = ApiClient::new("http://127.0.0.1:9").expect("client");
        ComparisonView::new(api, 10)
    }

    fn rec(label: &str) -> Recommendation {
        Recommendation {
            label: label.to_owned(),
            item_id: label.to_lowercase(),
            score: 0.5,
        }
    }

    #[test]
    fn key_follows_subject_and_k() {
        let mut view = offline_view();
        assert_eq!(view.key(), None);

        view.subject = Some(subject());
        view.k = 7;
        let key = view.key().expect("key");
        assert_eq!(key.k, 7);
        assert_eq!(key.user1, "user-1");
        assert_eq!(key.model2, "bpr");
    }

    #[test]
    fn rebuilds_only_on_new_input_or_aspect_change() {
        let mut view = offline_view();
        assert!(!view.needs_rebuild(1.5));

        let key = subject().key(5);
        view.input = Some((
            key,
            ComparisonInput {
                recs1: vec![rec("Heat"), rec("Alien")],
                recs2: vec![rec("Alien")],
                hist1: Vec::new(),
                hist2: Vec::new(),
            },
        ));
        assert!(view.needs_rebuild(1.5));

        view.rebuild(1.5);
        assert_eq!(view.graph.as_ref().map(|graph| graph.match_edges), Some(1));
        assert!(!view.needs_rebuild(1.505));
        assert!(view.needs_rebuild(1.6));
    }

    #[test]
    fn failed_fetch_drops_the_previous_graph() {
        let mut view = offline_view();
        view.subject = Some(subject());
        view.open = true;
        view.input = Some((subject().key(10), ComparisonInput::default()));
        view.rebuild(1.0);
        assert!(view.graph.is_some());

        view.set_k(12);
        let deadline = Instant::now() + Duration::from_secs(10);
        while view.input_request.is_pending() && Instant::now() < deadline {
            view.poll();
            thread::sleep(Duration::from_millis(20));
        }

        assert!(view.graph.is_none());
        assert!(view.error.is_some());

        assert!(view.requested.is_none());
        view.refresh();
        assert_eq!(view.requested, Some(subject().key(12)));
        assert!(view.input_request.is_pending());
        assert!(view.error.is_none());
    }

    #[test]
    fn new_key_clears_stale_metrics() {
        let mut view = offline_view();
        view.subject = Some(subject());
        view.open = true;
        view.metrics = Some(MetricsReport {
            similarity: Ok(MetricRecord::from([("jaccard".to_owned(), 0.25)])),
            graph: Err("no graph metrics".to_owned()),
        });

        view.set_k(20);
        assert!(view.metrics.is_none());
        assert_eq!(view.requested, Some(subject().key(20)));
    }

    #[test]
    fn open_view_follows_pane_selection() {
        let mut view = offline_view();
        view.open_for(subject());
        assert_eq!(view.requested, Some(subject().key(10)));

        let mut moved = subject();
        moved.user1 = "user-9".to_owned();
        view.follow(Some(moved.clone()));
        assert_eq!(view.subject.as_ref(), Some(&moved));
        assert_eq!(view.requested.as_ref().map(|key| key.user1.as_str()), Some("user-9"));

        let mut remodelled = moved.clone();
        remodelled.model1 = "ngcf".to_owned();
        view.follow(Some(remodelled.clone()));
        assert_eq!(view.requested, Some(remodelled.key(10)));

        view.follow(None);
        assert!(!view.is_open());
        assert!(view.requested.is_none());

        view.follow(Some(subject()));
        assert!(!view.is_open());
    }

    #[test]
    fn closing_forgets_the_subject() {
        let mut view = offline_view();
        view.subject = Some(subject());
        view.open = true;
        view.close();
        assert!(!view.is_open());
        assert_eq!(view.key(), None);
        assert!(!view.is_busy());
    }
}
