//! Covidash - COVID-19 CSV Dashboard & Interactive Chart Viewer
//!
//! Loads the 2020 case snapshot, aggregates it and renders the dashboard.

mod charts;
mod config;
mod data;
mod gui;

use config::AppConfig;
use eframe::egui;
use gui::CovidashApp;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> eframe::Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = AppConfig::load(Path::new(config::CONFIG_FILE));
    info!(data_path = %config.data_path.display(), "startup");

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("Covidash"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Covidash",
        options,
        Box::new(|cc| Ok(Box::new(CovidashApp::new(cc, config)))),
    )
}
