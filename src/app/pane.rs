use std::collections::HashMap;

use eframe::egui::Color32;
use log::{debug, error, info};
use thiserror::Error;

use crate::api::ApiClient;
use crate::graph::{
    CommunityId, CommunityOverlay, FilterColorMap, GraphStore, SelectionState,
    apply_recommendation_matches,
};
use crate::util::model_stem;

use super::render_utils::Camera;
use super::request::RequestSlot;
use super::ui::palette::PaletteState;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub(super) enum FetchRejected {
    #[error("Select a dataset first.")]
    NoDataset,
    #[error("Please specify a model.")]
    NoModel,
    #[error("Load a graph first.")]
    NoGraph,
}

pub(super) struct DatasetOptions {
    features: Vec<String>,
    models: Vec<String>,
}

pub(super) struct LoadedGraph {
    store: GraphStore,
    model: String,
    matched_edges: usize,
}

struct Communities {
    revision: u64,
    community_of: HashMap<String, CommunityId>,
}

pub(super) struct Pane {
    pub(super) name: &'static str,
    api: ApiClient,
    match_k: usize,
    dataset: Option<String>,
    pub(super) features: Vec<String>,
    pub(super) models: Vec<String>,
    pub(super) category: Option<String>,
    pub(super) query: String,
    pub(super) model: Option<String>,
    pub(super) filters: FilterColorMap,
    pub(super) graph: Option<GraphStore>,
    overlay: CommunityOverlay,
    pub(super) selection: SelectionState,
    selected_user: Option<String>,
    interaction_history: Option<String>,
    committed_model: Option<String>,
    pub(super) camera: Camera,
    pub(super) search: String,
    pub(super) menu_open: bool,
    pub(super) palette: PaletteState,
    pub(super) error: Option<String>,
    options_request: RequestSlot<DatasetOptions>,
    graph_request: RequestSlot<LoadedGraph>,
    community_request: RequestSlot<Communities>,
}

impl Pane {
    pub(super) fn new(name: &'static str, api: ApiClient, match_k: usize) -> Self {
        Self {
            name,
            api,
            match_k,
            dataset: None,
            features: Vec::new(),
            models: Vec::new(),
            category: None,
            query: String::new(),
            model: None,
            filters: FilterColorMap::default(),
            graph: None,
            overlay: CommunityOverlay::default(),
            selection: SelectionState::default(),
            selected_user: None,
            interaction_history: None,
            committed_model: None,
            camera: Camera::default(),
            search: String::new(),
            menu_open: false,
            palette: PaletteState::default(),
            error: None,
            options_request: RequestSlot::new("dataset options"),
            graph_request: RequestSlot::new("graph"),
            community_request: RequestSlot::new("communities"),
        }
    }

    pub(super) fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    pub(super) fn graph(&self) -> Option<&GraphStore> {
        self.graph.as_ref()
    }

    pub(super) fn selected_user(&self) -> Option<&str> {
        self.selected_user.as_deref()
    }

    pub(super) fn interaction_history(&self) -> Option<&str> {
        self.interaction_history.as_deref()
    }

    pub(super) fn committed_model(&self) -> Option<&str> {
        self.committed_model.as_deref()
    }

    pub(super) fn overlay_active(&self) -> bool {
        self.overlay.is_active()
    }

    pub(super) fn is_busy(&self) -> bool {
        self.graph_request.is_pending() || self.community_request.is_pending()
    }

    pub(super) fn is_loading_options(&self) -> bool {
        self.options_request.is_pending()
    }

    pub(super) fn set_dataset(&mut self, dataset: &str) {
        if self.dataset.as_deref() == Some(dataset) {
            return;
        }

        *self = Self::new(self.name, self.api.clone(), self.match_k);
        self.dataset = Some(dataset.to_owned());

        let api = self.api.clone();
        let dataset = dataset.to_owned();
        self.options_request.issue(move || {
            Ok(DatasetOptions {
                features: api.features(&dataset)?,
                models: api.models(&dataset)?,
            })
        });
    }

    pub(super) fn poll(&mut self) -> bool {
        let mut changed = false;

        if let Some(result) = self.options_request.poll() {
            changed = true;
            match result {
                Ok(options) => {
                    self.category = options.features.first().cloned();
                    self.model = options.models.first().cloned();
                    self.features = options.features;
                    self.models = options.models;
                }
                Err(message) => {
                    error!("{}: loading dataset options failed: {message}", self.name);
                    self.error = Some(message);
                }
            }
        }

        if let Some(result) = self.graph_request.poll() {
            changed = true;
            match result {
                Ok(loaded) => self.commit_graph(loaded),
                Err(message) => {
                    error!("{}: graph fetch failed: {message}", self.name);
                    self.error = Some(message);
                }
            }
        }

        if let Some(result) = self.community_request.poll() {
            changed = true;
            match result {
                Ok(communities) => self.show_communities(communities),
                Err(message) => {
                    error!("{}: community fetch failed: {message}", self.name);
                    self.error = Some(message);
                }
            }
        }

        changed
    }

    /// Assembles the whole store off the UI thread: load, match colouring,
    /// then filter colouring.
    pub(super) fn fetch_graph(&mut self) -> Result<(), FetchRejected> {
        let dataset = self.dataset.clone().ok_or(FetchRejected::NoDataset)?;
        let model = self.model.clone().ok_or(FetchRejected::NoModel)?;

        let api = self.api.clone();
        let filters = self.filters.clone();
        let match_k = self.match_k;
        self.error = None;
        self.community_request.cancel();

        info!(
            "{}: fetching graph for {dataset} with {} filters, model {model}",
            self.name,
            filters.entries().len()
        );
        self.graph_request.issue(move || {
            let raw = api.interaction_graph(&dataset, &filters.query_pairs())?;
            let top_k = api.topk_all(&dataset, &model, match_k)?;

            let mut store = GraphStore::from_raw(raw);
            let matched_edges = apply_recommendation_matches(&mut store, &top_k);
            filters.apply(&mut store);
            Ok(LoadedGraph {
                store,
                model,
                matched_edges,
            })
        });
        Ok(())
    }

    fn commit_graph(&mut self, loaded: LoadedGraph) {
        info!(
            "{}: graph committed with {} nodes, {} edges, {} recommendation matches",
            self.name,
            loaded.store.node_count(),
            loaded.store.edge_count(),
            loaded.matched_edges
        );

        self.graph = Some(loaded.store);
        self.overlay.reset();
        self.selection.reset();
        self.selected_user = None;
        self.interaction_history = None;
        self.committed_model = Some(model_stem(&loaded.model).to_owned());
        self.camera.request_fit();
        self.menu_open = false;
    }

    pub(super) fn toggle_communities(&mut self) -> Result<(), FetchRejected> {
        let Some(store) = self.graph.as_mut() else {
            return Err(FetchRejected::NoGraph);
        };

        if self.overlay.is_active() {
            self.overlay.toggle_off(store);
            self.selection.reset();
            return Ok(());
        }

        let dataset = self.dataset.clone().ok_or(FetchRejected::NoDataset)?;

        let api = self.api.clone();
        let filters = self.filters.query_pairs();
        let revision = store.revision();
        self.error = None;
        self.community_request.issue(move || {
            Ok(Communities {
                revision,
                community_of: api.communities(&dataset, &filters)?,
            })
        });
        Ok(())
    }

    fn show_communities(&mut self, communities: Communities) {
        let Some(store) = self.graph.as_mut() else {
            return;
        };
        if store.revision() != communities.revision {
            debug!("{}: community assignment for an older graph ignored", self.name);
            return;
        }

        self.overlay.toggle_on(store, &communities.community_of);
        self.selection.reset();
    }

    pub(super) fn add_filter(&mut self) {
        let Some(category) = self.category.as_deref() else {
            return;
        };
        if let Some(key) = self.filters.add_filter(category, &self.query) {
            debug!("{}: filter {key} added", self.name);
        }
    }

    pub(super) fn remove_filter(&mut self, key: &str) {
        self.filters.remove_filter(key);
        if self.palette.target.as_deref() == Some(key) {
            self.palette.close();
        }
    }

    pub(super) fn assign_color(&mut self, key: &str, color: Color32) {
        self.filters.assign_color(key, color);
    }

    pub(super) fn click_node(&mut self, id: &str) {
        let Some(store) = self.graph.as_ref() else {
            return;
        };
        let Some(outcome) = self.selection.click_node(store, id) else {
            return;
        };

        if outcome.user_id.is_some() {
            self.selected_user = outcome.user_id;
        }
        if outcome.interaction_history.is_some() {
            self.interaction_history = outcome.interaction_history;
        }
    }

    pub(super) fn focus_node(&mut self, id: &str) {
        if let Some(node) = self.graph.as_ref().and_then(|store| store.node(id)) {
            self.camera.center_on(node.position);
        }
        self.click_node(id);
    }

    pub(super) fn click_stage(&mut self) {
        if self.selection.click_stage() {
            self.selected_user = None;
            self.interaction_history = None;
        }
    }
}
