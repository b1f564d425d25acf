//! CSV Data Loader Module
//! Loads the case dataset with Polars, parses dates and derives active counts.

use once_cell::sync::Lazy;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

/// Column names expected in the source CSV.
pub const COUNTRY: &str = "Country/Region";
pub const DATE: &str = "Date";
pub const CONFIRMED: &str = "Confirmed";
pub const DEATHS: &str = "Deaths";
pub const RECOVERED: &str = "Recovered";
pub const ACTIVE: &str = "Active";

const REQUIRED_COLUMNS: [&str; 5] = [COUNTRY, DATE, CONFIRMED, DEATHS, RECOVERED];

#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Missing required columns: {0}")]
    MissingColumns(String),
    #[error("{0} date values could not be parsed")]
    UnparseableDates(usize),
    #[error("No data loaded")]
    NoData,
}

/// Process-wide table cache keyed by source path. The dataset is a static
/// historical snapshot, so entries are never invalidated.
static TABLE_CACHE: Lazy<Mutex<HashMap<PathBuf, DataFrame>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Handles CSV file loading with Polars for high performance.
pub struct DataLoader {
    df: Option<DataFrame>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self { df: None }
    }

    /// Load a CSV file through the process-wide cache.
    pub fn load_csv(&mut self, file_path: &Path) -> Result<&DataFrame, DataLoadError> {
        let df = cached_table(file_path)?;
        self.df = Some(df);
        self.df.as_ref().ok_or(DataLoadError::NoData)
    }

    /// Get sorted distinct country names from the loaded table.
    pub fn get_countries(&self) -> Vec<String> {
        let Some(df) = &self.df else {
            return Vec::new();
        };
        countries_of(df)
    }

    /// Get the number of rows in the DataFrame.
    pub fn get_row_count(&self) -> usize {
        self.df.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    /// Get a reference to the loaded DataFrame.
    pub fn get_dataframe(&self) -> Option<&DataFrame> {
        self.df.as_ref()
    }

    /// Set DataFrame directly (used for async loading)
    pub fn set_dataframe(&mut self, df: DataFrame) {
        self.df = Some(df);
    }
}

/// Load a table through the memoization cache. Clones are cheap because the
/// underlying column buffers are shared.
pub fn cached_table(path: &Path) -> Result<DataFrame, DataLoadError> {
    if let Some(df) = TABLE_CACHE.lock().unwrap().get(path) {
        debug!(path = %path.display(), "table cache hit");
        return Ok(df.clone());
    }

    let df = load_table(path)?;
    TABLE_CACHE
        .lock()
        .unwrap()
        .insert(path.to_path_buf(), df.clone());
    Ok(df)
}

/// Read, validate and prepare the case table from a CSV file.
///
/// The returned frame has `Date` parsed to a real date dtype, the count
/// columns cast to `Int64` with nulls filled as zero, rows without a country
/// dropped, and the derived `Active` column appended. `Active` may be
/// negative here; clamping happens where values are used as magnitudes.
pub fn load_table(path: &Path) -> Result<DataFrame, DataLoadError> {
    // Use lazy evaluation for memory efficiency, then collect
    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(10000))
        .with_ignore_errors(true)
        .finish()?
        .collect()?;

    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !columns.iter().any(|have| have == *c))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(DataLoadError::MissingColumns(missing.join(", ")));
    }

    let df = prepare_table(df)?;

    let bad_dates = df.column(DATE)?.null_count();
    if bad_dates > 0 {
        return Err(DataLoadError::UnparseableDates(bad_dates));
    }
    if df.height() == 0 {
        return Err(DataLoadError::NoData);
    }

    info!(
        path = %path.display(),
        rows = df.height(),
        "loaded case table"
    );
    Ok(df)
}

/// Parse dates, normalize count columns and derive `Active`.
fn prepare_table(df: DataFrame) -> Result<DataFrame, PolarsError> {
    let date_expr = if df.column(DATE)?.dtype() == &DataType::Date {
        col(DATE)
    } else {
        // Format left to inference so both ISO and slashed dates parse
        col(DATE).str().to_date(StrptimeOptions {
            format: None,
            strict: false,
            exact: true,
            cache: true,
        })
    };

    df.lazy()
        .filter(col(COUNTRY).is_not_null())
        .with_columns([
            date_expr,
            col(CONFIRMED).cast(DataType::Int64).fill_null(lit(0i64)),
            col(DEATHS).cast(DataType::Int64).fill_null(lit(0i64)),
            col(RECOVERED).cast(DataType::Int64).fill_null(lit(0i64)),
        ])
        .with_columns([(col(CONFIRMED) - col(DEATHS) - col(RECOVERED)).alias(ACTIVE)])
        .collect()
}

/// Sorted distinct country names of a prepared table.
pub fn countries_of(df: &DataFrame) -> Vec<String> {
    df.column(COUNTRY)
        .ok()
        .and_then(|col| col.unique().ok())
        .map(|unique| {
            let series = unique.as_materialized_series();
            let mut names: Vec<String> = (0..series.len())
                .filter_map(|i| {
                    let val = series.get(i).ok()?;
                    if val.is_null() {
                        None
                    } else {
                        Some(val.to_string().trim_matches('"').to_string())
                    }
                })
                .collect();
            names.sort();
            names
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
Province/State,Country/Region,Lat,Long,Date,Confirmed,Deaths,Recovered
,Afghanistan,33.0,65.0,2020-01-22,0,0,0
,Afghanistan,33.0,65.0,2020-01-23,5,1,2
New South Wales,Australia,-33.8,151.2,2020-01-22,3,0,0
Victoria,Australia,-37.8,144.9,2020-01-22,1,0,1
";

    fn write_csv(content: &str) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().expect("temp file");
        tmp.write_all(content.as_bytes()).expect("write csv");
        tmp
    }

    #[test]
    fn load_parses_dates_and_derives_active() {
        let tmp = write_csv(SAMPLE);
        let df = load_table(tmp.path()).expect("load");

        assert_eq!(df.height(), 4);
        assert_eq!(df.column(DATE).unwrap().dtype(), &DataType::Date);

        let active: Vec<i64> = df
            .column(ACTIVE)
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(active, vec![0, 2, 3, 0]);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = load_table(Path::new("/nonexistent/cases.csv")).unwrap_err();
        assert!(matches!(err, DataLoadError::CsvError(_)));
    }

    #[test]
    fn missing_columns_are_reported_by_name() {
        let tmp = write_csv("Country/Region,Date,Confirmed\nUS,2020-01-22,1\n");
        let err = load_table(tmp.path()).unwrap_err();
        match err {
            DataLoadError::MissingColumns(cols) => {
                assert!(cols.contains(DEATHS));
                assert!(cols.contains(RECOVERED));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cache_survives_source_file_deletion() {
        let tmp = write_csv(SAMPLE);
        let path = tmp.path().to_path_buf();

        let first = cached_table(&path).expect("first load");
        drop(tmp);
        assert!(!path.exists());

        let second = cached_table(&path).expect("cached load");
        assert_eq!(first.height(), second.height());
    }

    #[test]
    fn countries_are_sorted_and_distinct() {
        let tmp = write_csv(SAMPLE);
        let df = load_table(tmp.path()).expect("load");
        assert_eq!(countries_of(&df), vec!["Afghanistan", "Australia"]);
    }
}
