//! Dashboard Widget
//! Central scrollable panel with the four dashboard cards: global trend,
//! top-countries ranking, country timeline and the animated spread view.

use crate::charts::{ChartPlotter, SpreadFrame};
use crate::data::{CaseRecord, CountryTotal, DailyTotals};
use egui::{Color32, RichText, ScrollArea};
use std::time::{Duration, Instant};

const CARD_SPACING: f32 = 15.0;
const CHART_HEIGHT: f32 = 280.0;

/// Everything the dashboard needs from one aggregation pass.
pub struct DashboardData {
    pub totals: Vec<DailyTotals>,
    pub top: Vec<CountryTotal>,
    pub frames: Vec<SpreadFrame>,
    /// Largest clamped active count across all frames, fixing the bubble
    /// scale over the whole animation.
    pub max_active: i64,
}

/// Scrollable card stack for the dashboard charts. Owns the spread-view
/// playback state.
pub struct Dashboard {
    pub data: Option<DashboardData>,
    pub country_series: Vec<CaseRecord>,
    pub country: String,
    frame_idx: usize,
    playing: bool,
    last_advance: Instant,
    frame_interval: Duration,
}

impl Dashboard {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            data: None,
            country_series: Vec::new(),
            country: String::new(),
            frame_idx: 0,
            playing: false,
            last_advance: Instant::now(),
            frame_interval,
        }
    }

    /// Clear all charts
    pub fn clear(&mut self) {
        self.data = None;
        self.country_series.clear();
        self.frame_idx = 0;
        self.playing = false;
    }

    /// Install a fresh aggregation pass.
    pub fn set_data(&mut self, data: DashboardData) {
        self.frame_idx = data.frames.len().saturating_sub(1);
        self.playing = false;
        self.data = Some(data);
    }

    /// Install the selected country's series.
    pub fn set_country_series(&mut self, country: String, series: Vec<CaseRecord>) {
        self.country = country;
        self.country_series = series;
    }

    /// Draw the dashboard card stack
    pub fn show(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        if self.data.is_none() {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        }

        let frame_count = self.data.as_ref().map(|d| d.frames.len()).unwrap_or(0);
        self.advance_animation(frame_count);
        if self.playing {
            ctx.request_repaint_after(self.frame_interval);
        }

        let Some(data) = &self.data else {
            return;
        };

        // Borrow fields separately so the cards can mutate playback state
        let totals = &data.totals;
        let top = &data.top;
        let frames = &data.frames;
        let max_active = data.max_active;
        let country = self.country.clone();
        let country_series = &self.country_series;
        let mut frame_idx = self.frame_idx;
        let mut playing = self.playing;

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                Self::card(ui, "📈 Global Case Trends", |ui| {
                    ChartPlotter::draw_global_trend(ui, totals, CHART_HEIGHT);
                });
                ui.add_space(CARD_SPACING);

                let as_of = totals
                    .last()
                    .map(|t| t.date.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                Self::card(
                    ui,
                    &format!("🏆 Top {} Countries by Confirmed Cases (as of {})", top.len(), as_of),
                    |ui| {
                        ChartPlotter::draw_top_bar(ui, top, CHART_HEIGHT);
                    },
                );
                ui.add_space(CARD_SPACING);

                Self::card(ui, &format!("📊 {} Timeline", country), |ui| {
                    if country_series.is_empty() {
                        ui.label(
                            RichText::new("No data for this country")
                                .size(14.0)
                                .color(Color32::GRAY),
                        );
                    } else {
                        if let Some(last) = country_series.last() {
                            // Unclamped on purpose; only the spread view sizes by it
                            ui.label(
                                RichText::new(format!("Latest active cases: {}", last.active))
                                    .size(12.0)
                                    .color(Color32::GRAY),
                            );
                        }
                        ChartPlotter::draw_country_trend(ui, country_series, CHART_HEIGHT);
                    }
                });
                ui.add_space(CARD_SPACING);

                Self::card(ui, "🌐 Active Case Spread Over Time", |ui| {
                    if frames.is_empty() {
                        ui.label(RichText::new("No data").size(14.0).color(Color32::GRAY));
                        return;
                    }

                    ui.horizontal(|ui| {
                        let label = if playing { "⏸ Pause" } else { "▶ Play" };
                        if ui.button(label).clicked() {
                            playing = !playing;
                        }

                        let max_frame = frames.len() - 1;
                        ui.add(
                            egui::Slider::new(&mut frame_idx, 0..=max_frame)
                                .show_value(false),
                        );
                        ui.label(
                            RichText::new(frames[frame_idx].date.format("%Y-%m-%d").to_string())
                                .size(13.0)
                                .strong(),
                        );
                    });
                    ui.add_space(5.0);

                    ChartPlotter::draw_spread_frame(ui, &frames[frame_idx], max_active, CHART_HEIGHT);
                });
                ui.add_space(CARD_SPACING);
            });

        self.frame_idx = frame_idx;
        self.playing = playing;
    }

    /// Advance the playback cursor when the frame interval elapsed.
    fn advance_animation(&mut self, frame_count: usize) {
        if !self.playing || frame_count == 0 {
            return;
        }
        if self.last_advance.elapsed() >= self.frame_interval {
            self.frame_idx = (self.frame_idx + 1) % frame_count;
            self.last_advance = Instant::now();
        }
    }

    /// Draw one titled dashboard card in the shared frame style.
    fn card(ui: &mut egui::Ui, title: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(1.0, Color32::from_rgb(70, 70, 80)))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.vertical(|ui| {
                    ui.label(RichText::new(title).size(17.0).strong());
                    ui.add_space(8.0);
                    add_contents(ui);
                });
            });
    }
}
