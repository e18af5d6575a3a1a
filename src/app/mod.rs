use std::time::Duration;

use eframe::egui::{self, Context, RichText};
use log::{error, info};

use crate::api::ApiClient;
use crate::config::AppConfig;

mod canvas;
mod comparison;
mod pane;
mod render_utils;
mod request;
mod ui;

use comparison::{ComparisonSubject, ComparisonView};
use pane::Pane;
use request::RequestSlot;

const BUSY_REPAINT: Duration = Duration::from_millis(100);

pub struct RecVizApp {
    config: AppConfig,
    state: AppState,
}

enum AppState {
    Loading {
        api: ApiClient,
        catalog: RequestSlot<Vec<String>>,
    },
    Ready(Box<Workspace>),
    Failed(String),
}

struct Workspace {
    datasets: Vec<String>,
    dataset: Option<String>,
    left: Pane,
    right: Pane,
    comparison: ComparisonView,
}

impl RecVizApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let state = Self::start_load(&config);
        Self { config, state }
    }

    fn start_load(config: &AppConfig) -> AppState {
        let api = match ApiClient::new(&config.api_url) {
            Ok(api) => api,
            Err(e) => {
                let message = format!("{:#}", anyhow::Error::new(e));
                error!("cannot create API client: {message}");
                return AppState::Failed(message);
            }
        };

        info!("loading datasets from {}", api.base_url());
        let mut catalog = RequestSlot::<Vec<String>>::new("datasets");
        let fetch = api.clone();
        catalog.issue(move || Ok(fetch.datasets()?));
        AppState::Loading { api, catalog }
    }
}

impl eframe::App for RecVizApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { api, catalog } => {
                if let Some(result) = catalog.poll() {
                    transition = Some(match result {
                        Ok(datasets) => {
                            info!("{} datasets available", datasets.len());
                            AppState::Ready(Box::new(Workspace::new(
                                api.clone(),
                                &self.config,
                                datasets,
                            )))
                        }
                        Err(message) => {
                            error!("loading datasets failed: {message}");
                            AppState::Failed(message)
                        }
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Connecting to the recommendation service...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint_after(BUSY_REPAINT);
            }
            AppState::Failed(message) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load datasets");
                    ui.add_space(6.0);
                    ui.label(message.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.config));
                    }
                });
            }
            AppState::Ready(workspace) => workspace.show(ctx),
        }

        if let Some(state) = transition {
            self.state = state;
            ctx.request_repaint();
        }
    }
}

impl Workspace {
    fn new(api: ApiClient, config: &AppConfig, datasets: Vec<String>) -> Self {
        Self {
            datasets,
            dataset: None,
            left: Pane::new("left", api.clone(), config.match_k),
            right: Pane::new("right", api.clone(), config.match_k),
            comparison: ComparisonView::new(api, config.default_k),
        }
    }

    fn select_dataset(&mut self, dataset: String) {
        info!("dataset selected: {dataset}");
        self.left.set_dataset(&dataset);
        self.right.set_dataset(&dataset);
        self.comparison.close();
        self.dataset = Some(dataset);
    }

    fn comparison_subject(&self) -> Option<ComparisonSubject> {
        Some(ComparisonSubject {
            dataset: self.dataset.clone()?,
            model1: self.left.committed_model()?.to_owned(),
            model2: self.right.committed_model()?.to_owned(),
            user1: self.left.selected_user()?.to_owned(),
            user2: self.right.selected_user()?.to_owned(),
        })
    }

    fn is_busy(&self) -> bool {
        self.left.is_busy()
            || self.right.is_busy()
            || self.left.is_loading_options()
            || self.right.is_loading_options()
            || self.comparison.is_busy()
    }

    fn show(&mut self, ctx: &Context) {
        let mut changed = self.left.poll();
        changed |= self.right.poll();
        changed |= self.comparison.poll();

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let title = match &self.dataset {
                    Some(dataset) => format!("RecViz: {dataset}"),
                    None => "RecViz".to_owned(),
                };
                ui.heading(RichText::new(title).strong());
                ui.separator();

                let mut chosen = None;
                egui::ComboBox::from_id_salt("dataset")
                    .width(220.0)
                    .selected_text(self.dataset.as_deref().unwrap_or("Select a dataset"))
                    .show_ui(ui, |ui| {
                        for dataset in &self.datasets {
                            let selected = self.dataset.as_deref() == Some(dataset.as_str());
                            if ui.selectable_label(selected, dataset.as_str()).clicked()
                                && !selected
                            {
                                chosen = Some(dataset.clone());
                            }
                        }
                    });
                if let Some(dataset) = chosen {
                    self.select_dataset(dataset);
                }

                ui.separator();
                let subject = self.comparison_subject();
                if ui
                    .add_enabled(subject.is_some(), egui::Button::new("User comparison view"))
                    .on_disabled_hover_text("Select a user in both panes first")
                    .clicked()
                    && let Some(subject) = subject
                {
                    self.comparison.open_for(subject);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.columns(2, |columns| {
                self.left.show(&mut columns[0]);
                self.right.show(&mut columns[1]);
            });
        });

        if self.comparison.is_open() {
            self.comparison.follow(self.comparison_subject());
            self.comparison.show(ctx);
        }

        if changed {
            ctx.request_repaint();
        }
        if self.is_busy() {
            ctx.request_repaint_after(BUSY_REPAINT);
        }
    }
}
