use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use super::clean;
use super::model::{Row, Table, Value};
use super::Datasets;

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

/// Read a delimited file with a header row into a [`Table`].
/// Cell types are guessed per value (int, float, else string; empty → null).
pub fn load_table(path: &Path) -> Result<Table> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let mut row = Row::new();
        for (idx, cell) in record.iter().enumerate() {
            if let Some(column) = headers.get(idx) {
                row.insert(column.clone(), guess_value(cell));
            }
        }
        rows.push(row);
    }

    Ok(Table::new(headers, rows))
}

fn guess_value(s: &str) -> Value {
    let s = s.trim();
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    Value::Str(s.to_string())
}

// ---------------------------------------------------------------------------
// Session loading
// ---------------------------------------------------------------------------

/// Load and clean the three datasets. A failed load leaves that dataset
/// empty for the session; it is never fatal here (the session constructor
/// rejects the all-empty case).
pub fn load_datasets(screening: &Path, mortality: &Path, exam_income: &Path) -> Datasets {
    Datasets {
        screening: load_or_empty(screening, "screening", clean::clean_screening),
        mortality: load_or_empty(mortality, "mortality", clean::clean_mortality),
        exam_income: load_or_empty(exam_income, "exam_income", clean::clean_exam_income),
    }
}

fn load_or_empty(path: &Path, label: &str, clean: fn(&Table) -> Table) -> Table {
    match load_table(path) {
        Ok(raw) => {
            let cleaned = clean(&raw);
            info!(
                "loaded {} ({} raw rows, {} after cleaning)",
                label,
                raw.len(),
                cleaned.len()
            );
            cleaned
        }
        Err(err) => {
            warn!("{label} dataset unavailable: {err:#}");
            Table::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_table_guesses_cell_types() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "geo,TIME_PERIOD,OBS_VALUE,OBS_FLAG").unwrap();
        writeln!(file, "FR,2010,30.5,").unwrap();
        writeln!(file, "DE,2011,p,e").unwrap();
        file.flush().unwrap();

        let t = load_table(file.path()).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows[0]["TIME_PERIOD"], Value::Int(2010));
        assert_eq!(t.rows[0]["OBS_VALUE"], Value::Float(30.5));
        assert_eq!(t.rows[0]["OBS_FLAG"], Value::Null);
        assert_eq!(t.rows[1]["OBS_VALUE"], Value::Str("p".into()));
    }

    #[test]
    fn missing_file_yields_empty_dataset_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.csv");
        let datasets = load_datasets(&missing, &missing, &missing);
        assert!(datasets.all_empty());
    }
}
