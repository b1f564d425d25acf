//! Chart Plotter Module
//! Creates the interactive dashboard visualizations using egui_plot.

use crate::data::{CaseRecord, CountryTotal, DailyTotals, SpreadRow};
use chrono::NaiveDate;
use egui::Color32;
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};

/// Metric colors shared by every chart
pub const CONFIRMED_COLOR: Color32 = Color32::from_rgb(243, 156, 18); // Orange
pub const DEATHS_COLOR: Color32 = Color32::from_rgb(231, 76, 60); // Red
pub const RECOVERED_COLOR: Color32 = Color32::from_rgb(46, 204, 113); // Green
pub const ACTIVE_COLOR: Color32 = Color32::from_rgb(155, 89, 182); // Purple

const SPREAD_MAX_RADIUS: f32 = 20.0;
const SPREAD_MIN_RADIUS: f32 = 1.5;

/// One animation frame of the spread view: the countries of a single date,
/// ranked descending by clamped active cases and truncated to the configured
/// slot count.
#[derive(Debug, Clone)]
pub struct SpreadFrame {
    pub date: NaiveDate,
    pub rows: Vec<SpreadRow>,
}

/// Creates the dashboard charts using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Day offset of `date` from `first`, used as the x coordinate.
    pub fn day_offset(first: NaiveDate, date: NaiveDate) -> f64 {
        (date - first).num_days() as f64
    }

    /// Compact count labels for y axes (1.5M, 300k).
    pub fn format_count(value: f64) -> String {
        let abs = value.abs();
        if abs >= 1_000_000.0 {
            format!("{:.1}M", value / 1_000_000.0)
        } else if abs >= 1_000.0 {
            format!("{:.0}k", value / 1_000.0)
        } else {
            format!("{:.0}", value)
        }
    }

    fn date_formatter(first: NaiveDate) -> impl Fn(egui_plot::GridMark, &std::ops::RangeInclusive<f64>) -> String {
        move |mark, _range| {
            let days = mark.value.round() as i64;
            if days < 0 {
                return String::new();
            }
            (first + chrono::Duration::days(days))
                .format("%b %d")
                .to_string()
        }
    }

    /// Global confirmed/deaths/recovered trend lines.
    pub fn draw_global_trend(ui: &mut egui::Ui, totals: &[DailyTotals], height: f32) {
        let Some(first) = totals.first().map(|t| t.date) else {
            return;
        };

        let series: [(&str, Color32, Box<dyn Fn(&DailyTotals) -> i64>); 3] = [
            ("Confirmed", CONFIRMED_COLOR, Box::new(|t| t.confirmed)),
            ("Deaths", DEATHS_COLOR, Box::new(|t| t.deaths)),
            ("Recovered", RECOVERED_COLOR, Box::new(|t| t.recovered)),
        ];

        Plot::new("global_trend")
            .height(height)
            .allow_scroll(false)
            .legend(Legend::default())
            .x_axis_formatter(Self::date_formatter(first))
            .y_axis_formatter(|mark, _range| Self::format_count(mark.value))
            .show(ui, |plot_ui| {
                for (name, color, metric) in &series {
                    let points: PlotPoints = totals
                        .iter()
                        .map(|t| [Self::day_offset(first, t.date), metric(t) as f64])
                        .collect();
                    plot_ui.line(Line::new(points).color(*color).width(2.0).name(*name));
                }
            });
    }

    /// Horizontal ranking of the top countries on the latest date.
    pub fn draw_top_bar(ui: &mut egui::Ui, top: &[CountryTotal], height: f32) {
        if top.is_empty() {
            return;
        }

        let names: Vec<String> = top.iter().map(|t| t.country.clone()).collect();
        let bars: Vec<Bar> = top
            .iter()
            .enumerate()
            .map(|(i, t)| {
                Bar::new(i as f64, t.confirmed as f64)
                    .width(0.6)
                    .fill(CONFIRMED_COLOR.gamma_multiply(0.8))
                    .name(&t.country)
            })
            .collect();

        Plot::new("top_countries")
            .height(height)
            .allow_scroll(false)
            .allow_zoom(false)
            .allow_drag(false)
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round();
                if idx < 0.0 || (idx - mark.value).abs() > 0.3 {
                    return String::new();
                }
                names.get(idx as usize).cloned().unwrap_or_default()
            })
            .y_axis_formatter(|mark, _range| Self::format_count(mark.value))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars));
            });
    }

    /// One country's confirmed/deaths/recovered progression. Region-level
    /// records are drawn as-is, matching the unaggregated source series.
    pub fn draw_country_trend(ui: &mut egui::Ui, series: &[CaseRecord], height: f32) {
        let Some(first) = series.first().map(|r| r.date) else {
            return;
        };

        let metrics: [(&str, Color32, Box<dyn Fn(&CaseRecord) -> i64>); 3] = [
            ("Confirmed", CONFIRMED_COLOR, Box::new(|r| r.confirmed)),
            ("Deaths", DEATHS_COLOR, Box::new(|r| r.deaths)),
            ("Recovered", RECOVERED_COLOR, Box::new(|r| r.recovered)),
        ];

        Plot::new("country_trend")
            .height(height)
            .allow_scroll(false)
            .legend(Legend::default())
            .x_axis_formatter(Self::date_formatter(first))
            .y_axis_formatter(|mark, _range| Self::format_count(mark.value))
            .show(ui, |plot_ui| {
                for (name, color, metric) in &metrics {
                    let points: PlotPoints = series
                        .iter()
                        .map(|r| [Self::day_offset(first, r.date), metric(r) as f64])
                        .collect();
                    plot_ui.line(Line::new(points).color(*color).width(2.0).name(*name));
                }
            });
    }

    /// One frame of the animated spread view: a bubble per country, area
    /// scaled by clamped active cases against the all-frames maximum.
    pub fn draw_spread_frame(ui: &mut egui::Ui, frame: &SpreadFrame, max_active: i64, height: f32) {
        let names: Vec<String> = frame.rows.iter().map(|r| r.country.clone()).collect();

        Plot::new("spread_frame")
            .height(height)
            .allow_scroll(false)
            .allow_zoom(false)
            .allow_drag(false)
            .include_y(0.0)
            .include_y((max_active as f64) * 1.05)
            .include_x(-0.5)
            .include_x(frame.rows.len().max(1) as f64 - 0.5)
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round();
                if idx < 0.0 || (idx - mark.value).abs() > 0.3 {
                    return String::new();
                }
                names.get(idx as usize).cloned().unwrap_or_default()
            })
            .y_axis_formatter(|mark, _range| Self::format_count(mark.value))
            .show(ui, |plot_ui| {
                for (i, row) in frame.rows.iter().enumerate() {
                    let point: PlotPoints = vec![[i as f64, row.active as f64]].into();
                    plot_ui.points(
                        Points::new(point)
                            .radius(Self::bubble_radius(row.active, max_active))
                            .color(Self::bubble_color(row.active, max_active))
                            .name(&row.country),
                    );
                }
            });
    }

    /// Bubble area grows linearly with active cases, so the radius follows
    /// the square root.
    pub fn bubble_radius(active: i64, max_active: i64) -> f32 {
        if active <= 0 || max_active <= 0 {
            return SPREAD_MIN_RADIUS;
        }
        let scale = ((active as f64) / (max_active as f64)).sqrt() as f32;
        (SPREAD_MAX_RADIUS * scale).max(SPREAD_MIN_RADIUS)
    }

    /// Light-orange to dark-red ramp by share of the maximum.
    pub fn bubble_color(active: i64, max_active: i64) -> Color32 {
        let t = if max_active > 0 {
            ((active as f64) / (max_active as f64)).clamp(0.0, 1.0) as f32
        } else {
            0.0
        };
        let from = (254u8, 196u8, 79u8);
        let to = (177u8, 0u8, 38u8);
        let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color32::from_rgb(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    #[test]
    fn day_offset_counts_days_from_first() {
        let first = d(2020, 1, 22);
        assert_eq!(ChartPlotter::day_offset(first, first), 0.0);
        assert_eq!(ChartPlotter::day_offset(first, d(2020, 2, 1)), 10.0);
    }

    #[test]
    fn count_labels_are_compact() {
        assert_eq!(ChartPlotter::format_count(950.0), "950");
        assert_eq!(ChartPlotter::format_count(12_000.0), "12k");
        assert_eq!(ChartPlotter::format_count(2_500_000.0), "2.5M");
    }

    #[test]
    fn bubble_radius_scales_with_sqrt_and_never_vanishes() {
        let max = ChartPlotter::bubble_radius(100, 100);
        let quarter = ChartPlotter::bubble_radius(25, 100);
        assert!((quarter - max / 2.0).abs() < 0.01);
        assert!(ChartPlotter::bubble_radius(0, 100) > 0.0);
        assert!(ChartPlotter::bubble_radius(0, 0) > 0.0);
    }
}
