mod api;
mod app;
mod config;
mod graph;
mod util;

use clap::Parser;
use log::info;

use crate::config::{AppConfig, Args};

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from(Args::parse());
    info!("using recommendation service at {}", config.api_url);

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "RecViz",
        options,
        Box::new(move |cc| Ok(Box::new(app::RecVizApp::new(cc, config.clone())))),
    )
}
