use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::model::{Table, Value};

// ---------------------------------------------------------------------------
// Country / year predicates
// ---------------------------------------------------------------------------

/// Keep rows with `year` in `[y0, y1]` inclusive. No-op when either bound is
/// absent or the table has no year column; rows with a null year are dropped.
pub fn filter_by_years(table: &Table, y0: Option<i64>, y1: Option<i64>) -> Table {
    let (Some(y0), Some(y1)) = (y0, y1) else {
        return table.clone();
    };
    if !table.has_column("year") {
        return table.clone();
    }
    table.retain(|row| match row.get("year").and_then(Value::as_i64) {
        Some(y) => y0 <= y && y <= y1,
        None => false,
    })
}

/// Keep rows whose country is in the set. No-op when the set is empty or the
/// table has no country column.
pub fn filter_by_countries(table: &Table, countries: &BTreeSet<String>) -> Table {
    if countries.is_empty() || !table.has_column("country") {
        return table.clone();
    }
    table.retain(|row| match row.get("country").and_then(Value::as_str) {
        Some(c) => countries.contains(c),
        None => false,
    })
}

// ---------------------------------------------------------------------------
// Age-band restrictions
// ---------------------------------------------------------------------------

static MORTALITY_UNDER_50: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Y_LT|Y0-4|Y5-14|Y15-24|Y25-34|Y35-44|Y45-49").unwrap());

static EXAM_UNDER_50: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)Y1?5-24|Y25-34|Y30-39|Y35-44|Y40-44|Y40-49|Y45-49|Y_GE16_LT50|Y_LT50|\b(15-24|25-34|30-39|35-44|40-44|40-49|45-49)\b",
    )
    .unwrap()
});

/// True when a mortality age label denotes a band entirely below 50.
pub fn is_under_50_band(age: &str) -> bool {
    MORTALITY_UNDER_50.is_match(age)
}

/// Restrict a mortality table to under-50 age bands, keeping "TOTAL" rows as
/// a fallback so sparse countries still aggregate. The fallback dilutes the
/// under-50 signal when band-level data is missing; callers that need the
/// distinction split on "TOTAL" explicitly (see `aggregate::under50_share`).
pub fn restrict_under_50(mortality: &Table) -> Table {
    if !mortality.has_column("age") {
        return mortality.clone();
    }
    mortality.retain(|row| match row.get("age").and_then(Value::as_str) {
        Some(age) => age == "TOTAL" || is_under_50_band(age),
        None => false,
    })
}

/// Restrict an exam table to age groups below 50. Survey age groups come in
/// both Y-codes and plain ranges, so both spellings are matched.
pub fn restrict_exam_under_50(exam: &Table) -> Table {
    if !exam.has_column("age_group") {
        return exam.clone();
    }
    exam.retain(|row| match row.get("age_group").and_then(Value::as_str) {
        Some(age) => EXAM_UNDER_50.is_match(age),
        None => false,
    })
}

// ---------------------------------------------------------------------------
// Income-quintile canonicalization
// ---------------------------------------------------------------------------

static QUINTILE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^QU?([1-5])$").unwrap());

static QUINTILE_WORDS: Lazy<[(Regex, &'static str); 5]> = Lazy::new(|| {
    [
        (Regex::new(r"(LOWEST|FIRST|BOTTOM)\b").unwrap(), "Q1"),
        (Regex::new(r"\bSECOND\b").unwrap(), "Q2"),
        (Regex::new(r"\bTHIRD\b").unwrap(), "Q3"),
        (Regex::new(r"\bFOURTH\b").unwrap(), "Q4"),
        (Regex::new(r"(HIGHEST|FIFTH|TOP)\b").unwrap(), "Q5"),
    ]
});

const QUINTILES: [&str; 5] = ["Q1", "Q2", "Q3", "Q4", "Q5"];

/// Map the heterogeneous raw quintile encodings ("Q3", "QU3", "3", verbose
/// survey labels) onto Q1–Q5. Rules are tried in a fixed order and the first
/// match wins; anything unrecognized is `None`.
pub fn canonicalize_quintile(raw: &str) -> Option<&'static str> {
    let s = raw.trim().to_ascii_uppercase();
    if let Some(caps) = QUINTILE_CODE.captures(&s) {
        let digit = caps[1].parse::<usize>().ok()?;
        return Some(QUINTILES[digit - 1]);
    }
    if s.len() == 1 {
        if let Some(digit) = s.chars().next().and_then(|c| c.to_digit(10)) {
            if (1..=5).contains(&digit) {
                return Some(QUINTILES[digit as usize - 1]);
            }
        }
    }
    QUINTILE_WORDS
        .iter()
        .find(|(re, _)| re.is_match(&s))
        .map(|(_, q)| *q)
}
