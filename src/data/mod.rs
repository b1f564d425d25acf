//! Data module - CSV loading and aggregation queries

pub mod loader;
pub mod queries;

pub use loader::{DataLoadError, DataLoader};
pub use queries::{
    country_time_series, global_daily_totals, spread_over_time, top_countries_by_confirmed,
    CaseRecord, CountryTotal, DailyTotals, QueryError, SpreadRow,
};
