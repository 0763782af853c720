use std::collections::{BTreeMap, BTreeSet};

use super::filter::{is_under_50_band, restrict_exam_under_50};
use super::model::{Row, Table, Value};

// ---------------------------------------------------------------------------
// Scalar statistics
// ---------------------------------------------------------------------------

/// Median of the values; even-sized inputs average the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

// ---------------------------------------------------------------------------
// Group-by aggregation
// ---------------------------------------------------------------------------

/// Per-group median of `value_col`, grouped by `keys`. Nulls are skipped;
/// a group whose values are all null yields a null cell, not zero. The
/// result is ordered by the group key.
pub fn median_by(table: &Table, keys: &[&str], value_col: &str) -> Table {
    aggregate_by(table, keys, value_col, median)
}

/// Per-group arithmetic mean, same null semantics as [`median_by`].
pub fn mean_by(table: &Table, keys: &[&str], value_col: &str) -> Table {
    aggregate_by(table, keys, value_col, mean)
}

fn aggregate_by(
    table: &Table,
    keys: &[&str],
    value_col: &str,
    agg: fn(&[f64]) -> Option<f64>,
) -> Table {
    if !table.has_column(value_col) || keys.iter().any(|k| !table.has_column(k)) {
        return Table::empty();
    }

    let mut groups: BTreeMap<Vec<Value>, Vec<f64>> = BTreeMap::new();
    for row in &table.rows {
        let key: Vec<Value> = keys
            .iter()
            .map(|k| row.get(*k).cloned().unwrap_or(Value::Null))
            .collect();
        let entry = groups.entry(key).or_default();
        if let Some(v) = row.get(value_col).and_then(Value::as_f64) {
            entry.push(v);
        }
    }

    let columns: Vec<String> = keys
        .iter()
        .map(|k| k.to_string())
        .chain([value_col.to_string()])
        .collect();
    let rows = groups
        .into_iter()
        .map(|(key, values)| {
            let mut row = Row::new();
            for (k, v) in keys.iter().zip(key) {
                row.insert(k.to_string(), v);
            }
            row.insert(
                value_col.to_string(),
                agg(&values).map_or(Value::Null, Value::Float),
            );
            row
        })
        .collect();
    Table::new(columns, rows)
}

// ---------------------------------------------------------------------------
// Trend and gap metrics
// ---------------------------------------------------------------------------

/// Median values at the first and last observed year of an already-filtered
/// table, for "latest value, delta vs first year" KPIs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendDelta {
    pub first_year: i64,
    pub last_year: i64,
    pub first: f64,
    pub last: f64,
}

impl TrendDelta {
    pub fn delta(&self) -> f64 {
        self.last - self.first
    }
}

/// Compare the median of `value_col` at the earliest and latest year present.
/// `None` when the table is empty or either endpoint has no non-null value.
pub fn first_last_delta(table: &Table, year_col: &str, value_col: &str) -> Option<TrendDelta> {
    let (first_year, last_year) = table.min_max_i64(year_col)?;
    let first = median(&values_at_year(table, year_col, first_year, value_col))?;
    let last = median(&values_at_year(table, year_col, last_year, value_col))?;
    Some(TrendDelta {
        first_year,
        last_year,
        first,
        last,
    })
}

fn values_at_year(table: &Table, year_col: &str, year: i64, value_col: &str) -> Vec<f64> {
    table
        .rows
        .iter()
        .filter(|row| row.get(year_col).and_then(Value::as_i64) == Some(year))
        .filter_map(|row| row.get(value_col).and_then(Value::as_f64))
        .collect()
}

/// Q5 median minus Q1 median of exam_rate at the given survey year.
/// `None` when either quintile has no data for that year.
pub fn income_gap(exam: &Table, year: i64) -> Option<f64> {
    let at_year = exam.retain(|row| row.get("year").and_then(Value::as_i64) == Some(year));
    let q1 = quintile_median(&at_year, "Q1")?;
    let q5 = quintile_median(&at_year, "Q5")?;
    Some(q5 - q1)
}

fn quintile_median(exam: &Table, quintile: &str) -> Option<f64> {
    let values: Vec<f64> = exam
        .rows
        .iter()
        .filter(|row| row.get("income_quintile").and_then(Value::as_str) == Some(quintile))
        .filter_map(|row| row.get("exam_rate").and_then(Value::as_f64))
        .collect();
    median(&values)
}

/// Per-country Q1/Q5 exam-rate medians and their gap at the given survey
/// year. Countries missing either quintile are omitted.
/// Columns: country, q1, q5, gap.
pub fn income_gap_by_country(exam: &Table, year: i64) -> Table {
    let columns = vec![
        "country".to_string(),
        "q1".to_string(),
        "q5".to_string(),
        "gap".to_string(),
    ];
    if !exam.has_column("country")
        || !exam.has_column("income_quintile")
        || !exam.has_column("exam_rate")
    {
        return Table::new(columns, Vec::new());
    }
    let at_year = exam.retain(|row| row.get("year").and_then(Value::as_i64) == Some(year));

    let mut rows = Vec::new();
    for country in at_year.unique_strings("country") {
        let sub = at_year
            .retain(|row| row.get("country").and_then(Value::as_str) == Some(country.as_str()));
        if let (Some(q1), Some(q5)) = (quintile_median(&sub, "Q1"), quintile_median(&sub, "Q5")) {
            let mut row = Row::new();
            row.insert("country".into(), Value::Str(country));
            row.insert("q1".into(), Value::Float(q1));
            row.insert("q5".into(), Value::Float(q5));
            row.insert("gap".into(), Value::Float(q5 - q1));
            rows.push(row);
        }
    }
    Table::new(columns, rows)
}

/// Per (country, year): mean mortality of the explicit under-50 bands as a
/// share of the TOTAL-band mean, in percent. Pairs missing either side (or
/// with a zero TOTAL mean) are omitted. Columns: country, year, mort_u50,
/// mort_total, share_u50.
pub fn under50_share(mortality: &Table) -> Table {
    let columns = vec![
        "country".to_string(),
        "year".to_string(),
        "mort_u50".to_string(),
        "mort_total".to_string(),
        "share_u50".to_string(),
    ];
    if !mortality.has_column("age") || !mortality.has_column("mortality_rate") {
        return Table::new(columns, Vec::new());
    }

    let explicit = mortality.retain(|row| {
        matches!(row.get("age").and_then(Value::as_str), Some(age) if age != "TOTAL" && is_under_50_band(age))
    });
    let total = mortality.retain(|row| row.get("age").and_then(Value::as_str) == Some("TOTAL"));

    let under = mean_by(&explicit, &["country", "year"], "mortality_rate");
    let total = mean_by(&total, &["country", "year"], "mortality_rate");

    let total_by_key: BTreeMap<(String, i64), f64> = total
        .rows
        .iter()
        .filter_map(|row| {
            let country = row.get("country").and_then(Value::as_str)?.to_string();
            let year = row.get("year").and_then(Value::as_i64)?;
            let rate = row.get("mortality_rate").and_then(Value::as_f64)?;
            Some(((country, year), rate))
        })
        .collect();

    let mut rows = Vec::new();
    for row in &under.rows {
        let (Some(country), Some(year), Some(u50)) = (
            row.get("country").and_then(Value::as_str),
            row.get("year").and_then(Value::as_i64),
            row.get("mortality_rate").and_then(Value::as_f64),
        ) else {
            continue;
        };
        let Some(&total) = total_by_key.get(&(country.to_string(), year)) else {
            continue;
        };
        if total == 0.0 {
            continue;
        }
        let mut out = Row::new();
        out.insert("country".into(), Value::Str(country.to_string()));
        out.insert("year".into(), Value::Int(year));
        out.insert("mort_u50".into(), Value::Float(u50));
        out.insert("mort_total".into(), Value::Float(total));
        out.insert("share_u50".into(), Value::Float(u50 / total * 100.0));
        rows.push(out);
    }
    Table::new(columns, rows)
}

// ---------------------------------------------------------------------------
// Cross-dataset helpers
// ---------------------------------------------------------------------------

/// Overall [min, max] year across the given tables, skipping tables without
/// a usable year column.
pub fn year_bounds(tables: &[&Table]) -> Option<(i64, i64)> {
    let mut bounds: Option<(i64, i64)> = None;
    for table in tables {
        if let Some((lo, hi)) = table.min_max_i64("year") {
            bounds = Some(match bounds {
                Some((blo, bhi)) => (blo.min(lo), bhi.max(hi)),
                None => (lo, hi),
            });
        }
    }
    bounds
}

/// The `k` countries with the most observations across the given tables,
/// most-observed first. Ties break alphabetically for determinism.
pub fn default_countries(tables: &[&Table], k: usize) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for table in tables {
        if !table.has_column("country") {
            continue;
        }
        for row in &table.rows {
            if let Some(country) = row.get("country").and_then(Value::as_str) {
                *counts.entry(country.to_string()).or_default() += 1;
            }
        }
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(k).map(|(c, _)| c).collect()
}

/// One-year cross-metric panel keyed by country: screening median, under-50
/// and total mortality means with their share, and the income gap from the
/// latest survey year at or before `year`. Countries present in any source
/// appear; metrics they lack are null. Unlike [`under50_share`], the two
/// mortality sides are merged per country so a country reporting only TOTAL
/// (or only band-level) data still shows the side it has; the share needs
/// both.
/// Columns: country, year, screening_rate, mort_u50, mort_total, share_u50,
/// income_gap.
pub fn panel_for_year(screening: &Table, mortality: &Table, exam: &Table, year: i64) -> Table {
    let scr = median_by(
        &screening.retain(|row| row.get("year").and_then(Value::as_i64) == Some(year)),
        &["country"],
        "screening_rate",
    );

    let mort_at_year =
        mortality.retain(|row| row.get("year").and_then(Value::as_i64) == Some(year));
    let explicit = mort_at_year.retain(|row| {
        matches!(row.get("age").and_then(Value::as_str), Some(age) if age != "TOTAL" && is_under_50_band(age))
    });
    let total = mort_at_year
        .retain(|row| row.get("age").and_then(Value::as_str) == Some("TOTAL"));
    let u50_by_country =
        column_by_country(&mean_by(&explicit, &["country"], "mortality_rate"), "mortality_rate");
    let total_by_country =
        column_by_country(&mean_by(&total, &["country"], "mortality_rate"), "mortality_rate");

    // Income gap: the survey cadence differs from the yearly series, so use
    // the latest survey at or before the panel year.
    let exam_sub = restrict_exam_under_50(exam);
    let exam_le = exam_sub.retain(|row| {
        matches!(row.get("year").and_then(Value::as_i64), Some(y) if y <= year)
    });
    let gaps = exam_le
        .min_max_i64("year")
        .map(|(_, survey_year)| income_gap_by_country(&exam_sub, survey_year))
        .unwrap_or_default();

    let scr_by_country: BTreeMap<String, f64> = column_by_country(&scr, "screening_rate");
    let gap_by_country: BTreeMap<String, f64> = column_by_country(&gaps, "gap");

    let mut countries: BTreeSet<String> = scr_by_country.keys().cloned().collect();
    countries.extend(u50_by_country.keys().cloned());
    countries.extend(total_by_country.keys().cloned());

    let columns = vec![
        "country".to_string(),
        "year".to_string(),
        "screening_rate".to_string(),
        "mort_u50".to_string(),
        "mort_total".to_string(),
        "share_u50".to_string(),
        "income_gap".to_string(),
    ];
    let rows = countries
        .into_iter()
        .map(|country| {
            let mut row = Row::new();
            row.insert("year".into(), Value::Int(year));
            row.insert(
                "screening_rate".into(),
                scr_by_country
                    .get(&country)
                    .map_or(Value::Null, |&v| Value::Float(v)),
            );
            let u50 = u50_by_country.get(&country).copied();
            let total = total_by_country.get(&country).copied();
            let share = match (u50, total) {
                (Some(u), Some(t)) if t != 0.0 => Some(u / t * 100.0),
                _ => None,
            };
            row.insert("mort_u50".into(), u50.map_or(Value::Null, Value::Float));
            row.insert("mort_total".into(), total.map_or(Value::Null, Value::Float));
            row.insert("share_u50".into(), share.map_or(Value::Null, Value::Float));
            row.insert(
                "income_gap".into(),
                gap_by_country
                    .get(&country)
                    .map_or(Value::Null, |&v| Value::Float(v)),
            );
            row.insert("country".into(), Value::Str(country));
            row
        })
        .collect();
    Table::new(columns, rows)
}

fn column_by_country(table: &Table, value_col: &str) -> BTreeMap<String, f64> {
    table
        .rows
        .iter()
        .filter_map(|row| {
            let country = row.get("country").and_then(Value::as_str)?.to_string();
            let value = row.get(value_col).and_then(Value::as_f64)?;
            Some((country, value))
        })
        .collect()
}
