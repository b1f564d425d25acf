//! Aggregation Query Module
//! The four relational queries behind the dashboard charts, as Polars lazy
//! group-by pipelines over the prepared case table.

use crate::data::loader::{ACTIVE, CONFIRMED, COUNTRY, DATE, DEATHS, RECOVERED};
use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Query failed: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Country-summed totals for one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
}

/// Confirmed total for one country on the latest date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryTotal {
    pub country: String,
    pub confirmed: i64,
}

/// One aggregated row of a single country's timeline. `active` is carried
/// as derived, without clamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    pub country: String,
    pub date: NaiveDate,
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
    pub active: i64,
}

/// Per-date per-country totals for the animated spread view. `active` is
/// clamped at zero so it can be used as a bubble size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadRow {
    pub date: NaiveDate,
    pub country: String,
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
    pub active: i64,
}

/// Sum confirmed/deaths/recovered over all countries, one row per distinct
/// date, date ascending.
pub fn global_daily_totals(df: &DataFrame) -> Result<Vec<DailyTotals>, QueryError> {
    let out = df
        .clone()
        .lazy()
        .group_by([col(DATE)])
        .agg([
            col(CONFIRMED).sum(),
            col(DEATHS).sum(),
            col(RECOVERED).sum(),
        ])
        .sort([DATE], SortMultipleOptions::default())
        .collect()?;

    let dates = date_values(&out, DATE)?;
    let confirmed = int_values(&out, CONFIRMED)?;
    let deaths = int_values(&out, DEATHS)?;
    let recovered = int_values(&out, RECOVERED)?;

    Ok(dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| DailyTotals {
            date,
            confirmed: confirmed[i],
            deaths: deaths[i],
            recovered: recovered[i],
        })
        .collect())
}

/// Rank countries by summed confirmed cases on the latest date present in the
/// table, descending, truncated to `n`. Ties keep input order: the stable
/// group-by preserves first appearance and the sort maintains order.
pub fn top_countries_by_confirmed(
    df: &DataFrame,
    n: usize,
) -> Result<Vec<CountryTotal>, QueryError> {
    let out = df
        .clone()
        .lazy()
        .filter(col(DATE).eq(col(DATE).max()))
        .group_by_stable([col(COUNTRY)])
        .agg([col(CONFIRMED).sum()])
        .sort(
            [CONFIRMED],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .limit(n as IdxSize)
        .collect()?;

    let countries = str_values(&out, COUNTRY)?;
    let confirmed = int_values(&out, CONFIRMED)?;

    Ok(countries
        .into_iter()
        .enumerate()
        .map(|(i, country)| CountryTotal {
            country,
            confirmed: confirmed[i],
        })
        .collect())
}

/// All records for one country, date ascending (stable, so same-date region
/// rows keep input order). An unknown country yields an empty result, not an
/// error.
pub fn country_time_series(df: &DataFrame, country: &str) -> Result<Vec<CaseRecord>, QueryError> {
    let out = df
        .clone()
        .lazy()
        .filter(col(COUNTRY).eq(lit(country)))
        .sort(
            [DATE],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    let dates = date_values(&out, DATE)?;
    let confirmed = int_values(&out, CONFIRMED)?;
    let deaths = int_values(&out, DEATHS)?;
    let recovered = int_values(&out, RECOVERED)?;
    let active = int_values(&out, ACTIVE)?;

    Ok(dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| CaseRecord {
            country: country.to_string(),
            date,
            confirmed: confirmed[i],
            deaths: deaths[i],
            recovered: recovered[i],
            active: active[i],
        })
        .collect())
}

/// Per-date per-country sums of all four metrics, active clamped at zero,
/// ordered (date ascending, country ascending) for determinism.
pub fn spread_over_time(df: &DataFrame) -> Result<Vec<SpreadRow>, QueryError> {
    let out = df
        .clone()
        .lazy()
        .group_by([col(DATE), col(COUNTRY)])
        .agg([
            col(CONFIRMED).sum(),
            col(DEATHS).sum(),
            col(RECOVERED).sum(),
            col(ACTIVE).sum(),
        ])
        .with_columns([when(col(ACTIVE).lt(lit(0i64)))
            .then(lit(0i64))
            .otherwise(col(ACTIVE))
            .alias(ACTIVE)])
        .sort([DATE, COUNTRY], SortMultipleOptions::default())
        .collect()?;

    let dates = date_values(&out, DATE)?;
    let countries = str_values(&out, COUNTRY)?;
    let confirmed = int_values(&out, CONFIRMED)?;
    let deaths = int_values(&out, DEATHS)?;
    let recovered = int_values(&out, RECOVERED)?;
    let active = int_values(&out, ACTIVE)?;

    Ok(dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| SpreadRow {
            date,
            country: countries[i].clone(),
            confirmed: confirmed[i],
            deaths: deaths[i],
            recovered: recovered[i],
            active: active[i],
        })
        .collect())
}

fn date_values(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>, QueryError> {
    let series = df.column(name)?.as_materialized_series();
    Ok(series.date()?.as_date_iter().flatten().collect())
}

fn int_values(df: &DataFrame, name: &str) -> Result<Vec<i64>, QueryError> {
    let cast = df.column(name)?.cast(&DataType::Int64)?;
    let series = cast.as_materialized_series();
    Ok(series.i64()?.into_iter().map(|v| v.unwrap_or(0)).collect())
}

fn str_values(df: &DataFrame, name: &str) -> Result<Vec<String>, QueryError> {
    let series = df.column(name)?.as_materialized_series();
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or("").to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    /// Build a prepared table from (country, date, confirmed, deaths,
    /// recovered) rows, deriving `Active` the way the loader does.
    fn table(rows: &[(&str, NaiveDate, i64, i64, i64)]) -> DataFrame {
        let countries: Vec<String> = rows.iter().map(|r| r.0.to_string()).collect();
        let dates = DateChunked::from_naive_date(DATE.into(), rows.iter().map(|r| r.1));
        let confirmed: Vec<i64> = rows.iter().map(|r| r.2).collect();
        let deaths: Vec<i64> = rows.iter().map(|r| r.3).collect();
        let recovered: Vec<i64> = rows.iter().map(|r| r.4).collect();
        let active: Vec<i64> = rows.iter().map(|r| r.2 - r.3 - r.4).collect();

        DataFrame::new(vec![
            Column::new(COUNTRY.into(), countries),
            dates.into_column(),
            Column::new(CONFIRMED.into(), confirmed),
            Column::new(DEATHS.into(), deaths),
            Column::new(RECOVERED.into(), recovered),
            Column::new(ACTIVE.into(), active),
        ])
        .expect("fixture frame")
    }

    #[test]
    fn global_totals_sum_regions_per_date() {
        // Two US regions summed as one country, plus a second date
        let df = table(&[
            ("US", d(2020, 3, 1), 10, 1, 2),
            ("US", d(2020, 3, 1), 5, 0, 1),
            ("Italy", d(2020, 3, 2), 20, 2, 3),
        ]);

        let totals = global_daily_totals(&df).expect("query");
        assert_eq!(totals.len(), 2);
        assert_eq!(
            totals[0],
            DailyTotals {
                date: d(2020, 3, 1),
                confirmed: 15,
                deaths: 1,
                recovered: 3,
            }
        );

        let table_confirmed: i64 = 10 + 5 + 20;
        let totals_confirmed: i64 = totals.iter().map(|t| t.confirmed).sum();
        assert_eq!(totals_confirmed, table_confirmed);
    }

    #[test]
    fn global_totals_are_date_ascending() {
        let df = table(&[
            ("US", d(2020, 7, 27), 1, 0, 0),
            ("US", d(2020, 1, 22), 1, 0, 0),
            ("US", d(2020, 3, 1), 1, 0, 0),
        ]);

        let totals = global_daily_totals(&df).expect("query");
        let dates: Vec<NaiveDate> = totals.iter().map(|t| t.date).collect();
        assert_eq!(dates, vec![d(2020, 1, 22), d(2020, 3, 1), d(2020, 7, 27)]);
    }

    #[test]
    fn top_countries_use_only_the_latest_snapshot() {
        // Older rows carry huge counts and must not leak into the ranking
        let df = table(&[
            ("A", d(2020, 7, 26), 9999, 0, 0),
            ("A", d(2020, 7, 27), 100, 0, 0),
            ("B", d(2020, 7, 27), 50, 0, 0),
        ]);

        let top = top_countries_by_confirmed(&df, 10).expect("query");
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].country, "A");
        assert_eq!(top[0].confirmed, 100);
        assert_eq!(top[1].country, "B");
        assert_eq!(top[1].confirmed, 50);
    }

    #[test]
    fn top_countries_sorted_descending_and_truncated() {
        let latest = d(2020, 7, 27);
        let df = table(&[
            ("A", latest, 10, 0, 0),
            ("B", latest, 40, 0, 0),
            ("C", latest, 30, 0, 0),
            ("D", latest, 20, 0, 0),
        ]);

        let top = top_countries_by_confirmed(&df, 3).expect("query");
        assert_eq!(top.len(), 3);
        for pair in top.windows(2) {
            assert!(pair[0].confirmed >= pair[1].confirmed);
        }
        assert_eq!(top[0].country, "B");
    }

    #[test]
    fn top_countries_break_ties_by_input_order() {
        let latest = d(2020, 7, 27);
        let df = table(&[
            ("Zeta", latest, 50, 0, 0),
            ("Alpha", latest, 50, 0, 0),
        ]);

        let top = top_countries_by_confirmed(&df, 10).expect("query");
        assert_eq!(top[0].country, "Zeta");
        assert_eq!(top[1].country, "Alpha");
    }

    #[test]
    fn country_series_is_filtered_and_date_ascending() {
        let df = table(&[
            ("Australia", d(2020, 1, 23), 3, 0, 0),
            ("Australia", d(2020, 1, 22), 1, 0, 0),
            ("Australia", d(2020, 1, 22), 2, 0, 1),
            ("US", d(2020, 1, 22), 99, 0, 0),
        ]);

        let series = country_time_series(&df, "Australia").expect("query");
        // Region rows are kept as-is, only filtered and date-sorted
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].date, d(2020, 1, 22));
        assert_eq!(series[0].confirmed, 1);
        assert_eq!(series[1].confirmed, 2);
        assert_eq!(series[2].date, d(2020, 1, 23));
        assert!(series.iter().all(|r| r.country == "Australia"));
    }

    #[test]
    fn unknown_country_yields_empty_not_error() {
        let df = table(&[("US", d(2020, 3, 1), 10, 1, 2)]);
        let series = country_time_series(&df, "Atlantis").expect("query");
        assert!(series.is_empty());
    }

    #[test]
    fn country_series_keeps_negative_active_unclamped() {
        // Recovered exceeding confirmed is a known source-data wart
        let df = table(&[("US", d(2020, 3, 1), 5, 1, 10)]);
        let series = country_time_series(&df, "US").expect("query");
        assert_eq!(series[0].active, -6);
    }

    #[test]
    fn spread_clamps_active_at_zero() {
        let df = table(&[
            ("US", d(2020, 3, 1), 5, 1, 10),
            ("Italy", d(2020, 3, 1), 20, 2, 3),
        ]);

        let rows = spread_over_time(&df).expect("query");
        for row in &rows {
            assert!(row.active >= 0);
            let derived = row.confirmed - row.deaths - row.recovered;
            assert_eq!(row.active, derived.max(0));
        }
    }

    #[test]
    fn spread_is_ordered_by_date_then_country() {
        let df = table(&[
            ("US", d(2020, 3, 2), 1, 0, 0),
            ("Italy", d(2020, 3, 1), 1, 0, 0),
            ("US", d(2020, 3, 1), 1, 0, 0),
            ("Italy", d(2020, 3, 2), 1, 0, 0),
        ]);

        let rows = spread_over_time(&df).expect("query");
        let keys: Vec<(NaiveDate, &str)> =
            rows.iter().map(|r| (r.date, r.country.as_str())).collect();
        assert_eq!(
            keys,
            vec![
                (d(2020, 3, 1), "Italy"),
                (d(2020, 3, 1), "US"),
                (d(2020, 3, 2), "Italy"),
                (d(2020, 3, 2), "US"),
            ]
        );
    }

    #[test]
    fn spread_sums_regions_per_country() {
        let df = table(&[
            ("Australia", d(2020, 3, 1), 3, 0, 0),
            ("Australia", d(2020, 3, 1), 1, 0, 1),
        ]);

        let rows = spread_over_time(&df).expect("query");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].confirmed, 4);
        assert_eq!(rows[0].recovered, 1);
    }

    #[test]
    fn queries_are_idempotent() {
        let df = table(&[
            ("US", d(2020, 3, 1), 10, 1, 2),
            ("US", d(2020, 3, 2), 15, 2, 4),
            ("Italy", d(2020, 3, 1), 20, 2, 3),
        ]);

        assert_eq!(
            global_daily_totals(&df).expect("first"),
            global_daily_totals(&df).expect("second")
        );
        assert_eq!(
            top_countries_by_confirmed(&df, 10).expect("first"),
            top_countries_by_confirmed(&df, 10).expect("second")
        );
        assert_eq!(
            country_time_series(&df, "US").expect("first"),
            country_time_series(&df, "US").expect("second")
        );
        assert_eq!(
            spread_over_time(&df).expect("first"),
            spread_over_time(&df).expect("second")
        );
    }
}
