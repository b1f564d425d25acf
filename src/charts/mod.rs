//! Charts module - Chart rendering

mod plotter;
mod renderer;

pub use plotter::{ChartPlotter, SpreadFrame};
pub use renderer::StaticChartRenderer;
