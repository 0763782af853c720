use super::filter::canonicalize_quintile;
use super::model::{Table, Value};

/// Source columns that carry no analytical content. Dropped when present.
const DROPPED_METADATA: &[&str] = &["DATAFLOW", "LAST UPDATE", "freq", "CONF_STATUS", "OBS_FLAG"];

// Each cleaner is the same tolerant sequence: drop metadata columns, apply
// categorical filters, rename to semantic names, keep the analytical subset,
// coerce types, sort. A missing source column makes the affected step a
// no-op, never an error.

/// Clean the organized-screening dataset: breast cancer (C50) rows from
/// organized programmes (PRG) only.
pub fn clean_screening(raw: &Table) -> Table {
    raw.drop_columns(DROPPED_METADATA)
        .retain_if_column("icd10", |v| v.as_str() == Some("C50"))
        .retain_if_column("source", |v| v.as_str() == Some("PRG"))
        .rename_column("geo", "country")
        .rename_column("TIME_PERIOD", "year")
        .rename_column("OBS_VALUE", "screening_rate")
        .select_columns(&["country", "year", "unit", "source", "icd10", "screening_rate"])
        .coerce_int("year")
        .coerce_float("screening_rate")
        .sort_by(&["country", "year"])
}

/// Clean the cancer-mortality dataset: female breast-cancer (C50) rows only.
/// Sex and diagnosis filters use case-insensitive substring matches because
/// the source encodes both plain codes and verbose labels.
pub fn clean_mortality(raw: &Table) -> Table {
    raw.drop_columns(DROPPED_METADATA)
        .retain_if_column("sex", |v| contains_upper(v, "F"))
        .retain_if_column("icd10", |v| contains_upper(v, "C50"))
        .rename_column("geo", "country")
        .rename_column("TIME_PERIOD", "year")
        .rename_column("OBS_VALUE", "mortality_rate")
        .select_columns(&["country", "year", "unit", "age", "sex", "icd10", "mortality_rate"])
        .coerce_int("year")
        .coerce_float("mortality_rate")
        .sort_by(&["country", "year"])
}

/// Clean the self-reported exam-by-income dataset. Rows without an observed
/// value are dropped, and the raw quintile encodings are canonicalized to
/// Q1–Q5 (unrecognized labels become null but the row stays, so it can still
/// feed country/year-level aggregates).
pub fn clean_exam_income(raw: &Table) -> Table {
    raw.drop_columns(DROPPED_METADATA)
        .drop_null("OBS_VALUE")
        .rename_column("geo", "country")
        .rename_column("TIME_PERIOD", "year")
        .rename_column("age", "age_group")
        .rename_column("quant_inc", "income_quintile")
        .rename_column("OBS_VALUE", "exam_rate")
        .select_columns(&[
            "country",
            "year",
            "duration",
            "age_group",
            "income_quintile",
            "unit",
            "exam_rate",
        ])
        .map_column("income_quintile", canonical_quintile_value)
        .coerce_int("year")
        .coerce_float("exam_rate")
        .sort_by(&["country", "income_quintile"])
}

fn contains_upper(v: &Value, needle: &str) -> bool {
    match v.as_str() {
        Some(s) => s.to_ascii_uppercase().contains(needle),
        None => false,
    }
}

fn canonical_quintile_value(v: &Value) -> Value {
    let raw = match v {
        Value::Null => return Value::Null,
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    };
    match canonicalize_quintile(&raw) {
        Some(q) => Value::Str(q.to_string()),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{row, Row};

    fn screening_raw(geo: &str, year: i64, icd10: &str, source: &str, value: f64) -> Row {
        row(vec![
            ("DATAFLOW", Value::Str("ESTAT:HLTH_PS_SCRE".into())),
            ("geo", Value::Str(geo.into())),
            ("TIME_PERIOD", Value::Int(year)),
            ("icd10", Value::Str(icd10.into())),
            ("source", Value::Str(source.into())),
            ("unit", Value::Str("PC".into())),
            ("OBS_VALUE", Value::Float(value)),
        ])
    }

    #[test]
    fn screening_keeps_only_c50_prg_and_renames() {
        let raw = Table::new(
            vec![
                "DATAFLOW".into(),
                "geo".into(),
                "TIME_PERIOD".into(),
                "icd10".into(),
                "source".into(),
                "unit".into(),
                "OBS_VALUE".into(),
            ],
            vec![
                screening_raw("FR", 2020, "C50", "PRG", 55.0),
                screening_raw("FR", 2010, "C50", "PRG", 30.0),
                screening_raw("FR", 2020, "C50", "SRV", 60.0),
                screening_raw("FR", 2020, "C18", "PRG", 40.0),
            ],
        );
        let t = clean_screening(&raw);
        assert_eq!(t.len(), 2);
        assert!(!t.has_column("DATAFLOW"));
        assert!(t.has_column("country") && t.has_column("screening_rate"));
        // sorted by (country, year)
        assert_eq!(t.rows[0]["year"], Value::Int(2010));
        assert_eq!(t.rows[1]["year"], Value::Int(2020));
    }

    #[test]
    fn mortality_keeps_female_c50_via_substring_match() {
        let raw = Table::new(
            vec![
                "geo".into(),
                "TIME_PERIOD".into(),
                "sex".into(),
                "icd10".into(),
                "age".into(),
                "OBS_VALUE".into(),
            ],
            vec![
                row(vec![
                    ("geo", Value::Str("SE".into())),
                    ("TIME_PERIOD", Value::Int(2019)),
                    ("sex", Value::Str("Females".into())),
                    ("icd10", Value::Str("c50".into())),
                    ("age", Value::Str("TOTAL".into())),
                    ("OBS_VALUE", Value::Float(28.1)),
                ]),
                row(vec![
                    ("geo", Value::Str("SE".into())),
                    ("TIME_PERIOD", Value::Int(2019)),
                    ("sex", Value::Str("M".into())),
                    ("icd10", Value::Str("C50".into())),
                    ("age", Value::Str("TOTAL".into())),
                    ("OBS_VALUE", Value::Float(0.3)),
                ]),
            ],
        );
        let t = clean_mortality(&raw);
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows[0]["mortality_rate"], Value::Float(28.1));
    }

    #[test]
    fn exam_income_canonicalizes_quintiles_and_drops_missing_values() {
        let raw = Table::new(
            vec![
                "geo".into(),
                "TIME_PERIOD".into(),
                "age".into(),
                "quant_inc".into(),
                "OBS_VALUE".into(),
            ],
            vec![
                row(vec![
                    ("geo", Value::Str("PL".into())),
                    ("TIME_PERIOD", Value::Int(2019)),
                    ("age", Value::Str("Y45-49".into())),
                    ("quant_inc", Value::Str("QU5".into())),
                    ("OBS_VALUE", Value::Float(61.0)),
                ]),
                row(vec![
                    ("geo", Value::Str("PL".into())),
                    ("TIME_PERIOD", Value::Int(2019)),
                    ("age", Value::Str("Y45-49".into())),
                    ("quant_inc", Value::Str("TOTAL".into())),
                    ("OBS_VALUE", Value::Float(48.0)),
                ]),
                row(vec![
                    ("geo", Value::Str("PL".into())),
                    ("TIME_PERIOD", Value::Int(2019)),
                    ("age", Value::Str("Y45-49".into())),
                    ("quant_inc", Value::Str("QU1".into())),
                    ("OBS_VALUE", Value::Null),
                ]),
            ],
        );
        let t = clean_exam_income(&raw);
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows[0]["income_quintile"], Value::Null); // TOTAL → null, row kept
        assert_eq!(t.rows[1]["income_quintile"], Value::Str("Q5".into()));
    }

    #[test]
    fn cleaners_tolerate_missing_columns() {
        let raw = Table::new(
            vec!["geo".into(), "OBS_VALUE".into()],
            vec![row(vec![
                ("geo", Value::Str("FR".into())),
                ("OBS_VALUE", Value::Float(12.0)),
            ])],
        );
        // No icd10/source/sex columns: filters are no-ops, row survives.
        assert_eq!(clean_screening(&raw).len(), 1);
        assert_eq!(clean_mortality(&raw).len(), 1);
        assert_eq!(clean_exam_income(&raw).len(), 1);
    }
}
