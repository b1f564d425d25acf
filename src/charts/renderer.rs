//! Static Chart Renderer
//! Renders the global trend and top-countries charts to a PNG report with
//! plotters, for export from the GUI.

use crate::charts::ChartPlotter;
use crate::data::{CountryTotal, DailyTotals};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use plotters::prelude::*;
use std::path::Path;

const TREND_COLOR_CONFIRMED: RGBColor = RGBColor(243, 156, 18);
const TREND_COLOR_DEATHS: RGBColor = RGBColor(231, 76, 60);
const TREND_COLOR_RECOVERED: RGBColor = RGBColor(46, 204, 113);
const BAR_COLOR: RGBColor = RGBColor(211, 84, 0);

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render the exported report: global trend on top, top-countries bars
    /// below.
    pub fn render_report(
        path: &Path,
        totals: &[DailyTotals],
        top: &[CountryTotal],
        width: u32,
        height: u32,
    ) -> Result<()> {
        let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| anyhow!("fill background: {e}"))?;

        let (upper, lower) = root.split_vertically((height / 2) as i32);
        Self::draw_trend(&upper, totals)?;
        Self::draw_top_bars(&lower, top)?;

        root.present()
            .with_context(|| format!("write report to {}", path.display()))?;
        Ok(())
    }

    fn draw_trend(
        area: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
        totals: &[DailyTotals],
    ) -> Result<()> {
        let Some(first) = totals.first().map(|t| t.date) else {
            return Ok(());
        };
        let max_day = totals
            .last()
            .map(|t| ChartPlotter::day_offset(first, t.date))
            .unwrap_or(1.0)
            .max(1.0);
        let y_max = totals
            .iter()
            .map(|t| t.confirmed.max(t.deaths).max(t.recovered))
            .max()
            .unwrap_or(1)
            .max(1) as f64
            * 1.05;

        let mut chart = ChartBuilder::on(area)
            .caption("Global COVID-19 Case Trends", ("sans-serif", 28))
            .margin(12)
            .x_label_area_size(36)
            .y_label_area_size(70)
            .build_cartesian_2d(0f64..max_day, 0f64..y_max)
            .map_err(|e| anyhow!("build trend chart: {e}"))?;

        chart
            .configure_mesh()
            .x_label_formatter(&|day| Self::date_label(first, *day))
            .y_label_formatter(&|v| ChartPlotter::format_count(*v))
            .draw()
            .map_err(|e| anyhow!("draw trend mesh: {e}"))?;

        let series: [(&str, RGBColor, fn(&DailyTotals) -> i64); 3] = [
            ("Confirmed", TREND_COLOR_CONFIRMED, |t| t.confirmed),
            ("Deaths", TREND_COLOR_DEATHS, |t| t.deaths),
            ("Recovered", TREND_COLOR_RECOVERED, |t| t.recovered),
        ];

        for (name, color, metric) in series {
            chart
                .draw_series(LineSeries::new(
                    totals
                        .iter()
                        .map(|t| (ChartPlotter::day_offset(first, t.date), metric(t) as f64)),
                    color.stroke_width(2),
                ))
                .map_err(|e| anyhow!("draw {name} series: {e}"))?
                .label(name)
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
                });
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(|e| anyhow!("draw trend legend: {e}"))?;
        Ok(())
    }

    fn draw_top_bars(
        area: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
        top: &[CountryTotal],
    ) -> Result<()> {
        if top.is_empty() {
            return Ok(());
        }
        let y_max = top.iter().map(|t| t.confirmed).max().unwrap_or(1).max(1) as f64 * 1.1;
        let names: Vec<String> = top.iter().map(|t| t.country.clone()).collect();

        let mut chart = ChartBuilder::on(area)
            .caption("Top Countries by Confirmed Cases", ("sans-serif", 28))
            .margin(12)
            .x_label_area_size(48)
            .y_label_area_size(70)
            .build_cartesian_2d(0f64..top.len() as f64, 0f64..y_max)
            .map_err(|e| anyhow!("build bar chart: {e}"))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(top.len())
            .x_label_formatter(&|x| {
                let idx = (*x - 0.5).round();
                if idx < 0.0 || ((*x - 0.5) - idx).abs() > 0.3 {
                    return String::new();
                }
                names.get(idx as usize).cloned().unwrap_or_default()
            })
            .y_label_formatter(&|v| ChartPlotter::format_count(*v))
            .draw()
            .map_err(|e| anyhow!("draw bar mesh: {e}"))?;

        chart
            .draw_series(top.iter().enumerate().map(|(i, t)| {
                Rectangle::new(
                    [
                        (i as f64 + 0.15, 0.0),
                        (i as f64 + 0.85, t.confirmed as f64),
                    ],
                    BAR_COLOR.filled(),
                )
            }))
            .map_err(|e| anyhow!("draw bars: {e}"))?;
        Ok(())
    }

    fn date_label(first: NaiveDate, day: f64) -> String {
        let days = day.round() as i64;
        if days < 0 {
            return String::new();
        }
        (first + chrono::Duration::days(days))
            .format("%b %d")
            .to_string()
    }
}
