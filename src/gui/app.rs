//! Covidash Main Application
//! Main window with control panel and dashboard, background load + aggregation.

use crate::charts::{SpreadFrame, StaticChartRenderer};
use crate::config::AppConfig;
use crate::data::{self, DataLoader, QueryError, SpreadRow};
use crate::gui::dashboard::DashboardData;
use crate::gui::{ControlPanel, ControlPanelAction, Dashboard};
use egui::SidePanel;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// Load + aggregation result from background thread
enum LoadResult {
    Progress(f32, String),
    Complete {
        df: DataFrame,
        countries: Vec<String>,
        row_count: usize,
        data: DashboardData,
    },
    Error(String),
}

/// Main application window.
pub struct CovidashApp {
    config: AppConfig,
    loader: DataLoader,
    control_panel: ControlPanel,
    dashboard: Dashboard,

    // Async CSV loading + aggregation
    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,
}

impl CovidashApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let mut app = Self {
            dashboard: Dashboard::new(Duration::from_millis(config.frame_millis)),
            loader: DataLoader::new(),
            control_panel: ControlPanel::new(),
            load_rx: None,
            is_loading: false,
            config,
        };
        // The dataset is static, load it right away
        app.start_load(app.config.data_path.clone());
        app
    }

    /// Kick off CSV load + aggregation on a background thread.
    fn start_load(&mut self, path: PathBuf) {
        if self.is_loading {
            return;
        }

        self.dashboard.clear();
        self.control_panel.export_enabled = false;
        self.control_panel.settings.csv_path = Some(path.clone());
        self.control_panel.set_progress(0.0, "Loading CSV file...");
        self.is_loading = true;

        let (tx, rx) = channel();
        self.load_rx = Some(rx);

        let top_n = self.config.top_n;
        let map_slots = self.config.map_slots;

        thread::spawn(move || {
            Self::run_load(tx, path, top_n, map_slots);
        });
    }

    /// Load the table and run the aggregation pass (called from background
    /// thread).
    fn run_load(tx: Sender<LoadResult>, path: PathBuf, top_n: usize, map_slots: usize) {
        let _ = tx.send(LoadResult::Progress(10.0, "Reading CSV file...".to_string()));

        let mut loader = DataLoader::new();
        if let Err(e) = loader.load_csv(&path) {
            let _ = tx.send(LoadResult::Error(e.to_string()));
            return;
        }

        let countries = loader.get_countries();
        let row_count = loader.get_row_count();
        let Some(df) = loader.get_dataframe().cloned() else {
            let _ = tx.send(LoadResult::Error("No data loaded".to_string()));
            return;
        };

        let _ = tx.send(LoadResult::Progress(50.0, "Aggregating...".to_string()));

        match Self::build_dashboard_data(&df, top_n, map_slots) {
            Ok(data) => {
                let _ = tx.send(LoadResult::Complete {
                    df,
                    countries,
                    row_count,
                    data,
                });
            }
            Err(e) => {
                let _ = tx.send(LoadResult::Error(e.to_string()));
            }
        }
    }

    /// Run the country-independent queries and prepare the animation frames.
    fn build_dashboard_data(
        df: &DataFrame,
        top_n: usize,
        map_slots: usize,
    ) -> Result<DashboardData, QueryError> {
        let totals = data::global_daily_totals(df)?;
        let top = data::top_countries_by_confirmed(df, top_n)?;
        let spread = data::spread_over_time(df)?;

        let frames = Self::build_frames(spread, map_slots);
        let max_active = frames
            .iter()
            .flat_map(|f| f.rows.iter().map(|r| r.active))
            .max()
            .unwrap_or(0);

        info!(
            days = totals.len(),
            frames = frames.len(),
            "aggregation pass complete"
        );

        Ok(DashboardData {
            totals,
            top,
            frames,
            max_active,
        })
    }

    /// Cut the (date asc, country asc) spread rows into per-date frames,
    /// then rank each frame by active cases and keep the top slots.
    fn build_frames(rows: Vec<SpreadRow>, slots: usize) -> Vec<SpreadFrame> {
        let mut frames: Vec<SpreadFrame> = Vec::new();
        for row in rows {
            match frames.last_mut() {
                Some(frame) if frame.date == row.date => frame.rows.push(row),
                _ => frames.push(SpreadFrame {
                    date: row.date,
                    rows: vec![row],
                }),
            }
        }

        frames.par_iter_mut().for_each(|frame| {
            frame
                .rows
                .sort_by(|a, b| b.active.cmp(&a.active).then_with(|| a.country.cmp(&b.country)));
            frame.rows.truncate(slots);
        });
        frames
    }

    /// Check for load results
    fn check_load_results(&mut self) {
        let rx = self.load_rx.take();
        if let Some(rx) = rx {
            let mut should_keep_receiver = true;

            while let Ok(result) = rx.try_recv() {
                match result {
                    LoadResult::Progress(progress, status) => {
                        self.control_panel.set_progress(progress, &status);
                    }
                    LoadResult::Complete {
                        df,
                        countries,
                        row_count,
                        data,
                    } => {
                        self.loader.set_dataframe(df);
                        self.control_panel.update_countries(countries);
                        self.dashboard.set_data(data);
                        self.refresh_country_series();
                        self.control_panel.export_enabled = true;
                        self.control_panel
                            .set_progress(100.0, &format!("Complete! {} rows loaded", row_count));
                        self.is_loading = false;
                        should_keep_receiver = false;
                    }
                    LoadResult::Error(err) => {
                        self.control_panel.set_progress(0.0, &format!("Error: {}", err));
                        self.is_loading = false;
                        should_keep_receiver = false;
                    }
                }
            }

            if should_keep_receiver {
                self.load_rx = Some(rx);
            }
        }
    }

    /// Re-run the per-country query for the current selection. An empty
    /// result is a valid outcome rendered as a "no data" card.
    fn refresh_country_series(&mut self) {
        let country = self.control_panel.settings.country.clone();
        let Some(df) = self.loader.get_dataframe() else {
            return;
        };

        match data::country_time_series(df, &country) {
            Ok(series) => {
                if series.is_empty() {
                    warn!(country = %country, "no rows for selected country");
                }
                self.dashboard.set_country_series(country, series);
            }
            Err(e) => {
                error!(country = %country, error = %e, "country query failed");
                self.control_panel.set_progress(0.0, &format!("Error: {}", e));
            }
        }
    }

    /// Handle CSV file selection
    fn handle_browse_csv(&mut self) {
        if self.is_loading {
            return;
        }

        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            self.start_load(path);
        }
    }

    /// Render the global trend + top-countries report to a PNG and open it.
    fn handle_export_report(&mut self) {
        let Some(data) = &self.dashboard.data else {
            self.control_panel.set_progress(0.0, "No charts to export");
            return;
        };

        let output_path = match rfd::FileDialog::new()
            .add_filter("PNG Image", &["png"])
            .set_file_name("covidash_report.png")
            .save_file()
        {
            Some(path) => path,
            None => return, // User cancelled
        };

        self.control_panel.set_progress(50.0, "Rendering report...");

        match StaticChartRenderer::render_report(&output_path, &data.totals, &data.top, 1400, 1000)
        {
            Ok(()) => {
                self.control_panel
                    .set_progress(100.0, &format!("Exported {}", output_path.display()));
                if let Err(e) = open::that(&output_path) {
                    warn!(error = %e, "could not open exported report");
                }
            }
            Err(e) => {
                self.control_panel
                    .set_progress(0.0, &format!("Error: {}", e));
            }
        }
    }
}

impl eframe::App for CovidashApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for background results
        self.check_load_results();

        // Request repaint while loading
        if self.is_loading {
            ctx.request_repaint();
        }

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(280.0)
            .max_width(330.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::BrowseCsv => self.handle_browse_csv(),
                        ControlPanelAction::CountryChanged => self.refresh_country_series(),
                        ControlPanelAction::ExportReport => self.handle_export_report(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Dashboard
        egui::CentralPanel::default().show(ctx, |ui| {
            self.dashboard.show(ctx, ui);
        });
    }
}
