use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Value – a single cell of a table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the dtypes seen in the raw CSVs.
/// Used as a `BTreeMap` key downstream (group-by), so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
}

// -- Manual Eq/Ord so Value can key a BTreeMap --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Int(_) => 1,
                Float(_) => 2,
                Str(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Str(a), Str(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "<null>"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Integer view; floats qualify only when they carry no fraction.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Row / Table – an ordered collection of rows sharing a column set
// ---------------------------------------------------------------------------

/// One row of a table: column name → cell value.
pub type Row = BTreeMap<String, Value>;

/// An in-memory table. Every transformation returns a new `Table`; rows are
/// never mutated in place, so derived views can be recomputed freely.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Column names in presentation order.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Table { columns, rows }
    }

    pub fn empty() -> Self {
        Table::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Keep rows satisfying the predicate.
    pub fn retain<F>(&self, keep: F) -> Table
    where
        F: Fn(&Row) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Keep rows whose `column` value satisfies the predicate.
    /// No-op when the column is absent (tolerant cleaning policy).
    pub fn retain_if_column<F>(&self, column: &str, keep: F) -> Table
    where
        F: Fn(&Value) -> bool,
    {
        if !self.has_column(column) {
            return self.clone();
        }
        self.retain(|row| row.get(column).is_some_and(|v| keep(v)))
    }

    /// Drop the listed columns; absent names are ignored.
    pub fn drop_columns(&self, dropped: &[&str]) -> Table {
        let columns: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !dropped.contains(&c.as_str()))
            .cloned()
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|(k, _)| !dropped.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .collect();
        Table { columns, rows }
    }

    /// Keep only the listed columns, in the listed order; absent names are
    /// skipped rather than raising.
    pub fn select_columns(&self, selected: &[&str]) -> Table {
        let columns: Vec<String> = selected
            .iter()
            .filter(|c| self.has_column(c))
            .map(|c| c.to_string())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                    .collect()
            })
            .collect();
        Table { columns, rows }
    }

    /// Rename a column; no-op when `from` is absent.
    pub fn rename_column(&self, from: &str, to: &str) -> Table {
        if !self.has_column(from) {
            return self.clone();
        }
        let columns = self
            .columns
            .iter()
            .map(|c| if c == from { to.to_string() } else { c.clone() })
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(k, v)| {
                        let key = if k == from { to.to_string() } else { k.clone() };
                        (key, v.clone())
                    })
                    .collect()
            })
            .collect();
        Table { columns, rows }
    }

    /// Apply `f` to every value of a column; no-op when the column is absent.
    pub fn map_column<F>(&self, column: &str, f: F) -> Table
    where
        F: Fn(&Value) -> Value,
    {
        if !self.has_column(column) {
            return self.clone();
        }
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                if let Some(v) = row.get_mut(column) {
                    *v = f(v);
                }
                row
            })
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Coerce a column to integers; unparseable values become `Null`.
    pub fn coerce_int(&self, column: &str) -> Table {
        self.map_column(column, |v| match v {
            Value::Int(i) => Value::Int(*i),
            Value::Float(f) => Value::Int(*f as i64),
            Value::Str(s) => match s.trim().parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => s
                    .trim()
                    .parse::<f64>()
                    .map_or(Value::Null, |f| Value::Int(f as i64)),
            },
            Value::Null => Value::Null,
        })
    }

    /// Coerce a column to floats; unparseable values become `Null`.
    pub fn coerce_float(&self, column: &str) -> Table {
        self.map_column(column, |v| match v {
            Value::Float(f) => Value::Float(*f),
            Value::Int(i) => Value::Float(*i as f64),
            Value::Str(s) => s.trim().parse::<f64>().map_or(Value::Null, Value::Float),
            Value::Null => Value::Null,
        })
    }

    /// Drop rows whose `column` value is null or missing.
    pub fn drop_null(&self, column: &str) -> Table {
        if !self.has_column(column) {
            return self.clone();
        }
        self.retain(|row| row.get(column).is_some_and(|v| !v.is_null()))
    }

    /// Stable sort by the given key columns; missing values sort first.
    pub fn sort_by(&self, keys: &[&str]) -> Table {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            for key in keys {
                let va = a.get(*key).unwrap_or(&Value::Null);
                let vb = b.get(*key).unwrap_or(&Value::Null);
                let ord = va.cmp(vb);
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Sorted set of distinct string values in a column.
    pub fn unique_strings(&self, column: &str) -> BTreeSet<String> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column).and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    /// Non-null numeric values of a column.
    pub fn column_f64(&self, column: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column).and_then(Value::as_f64))
            .collect()
    }

    /// Minimum and maximum integer value of a column, skipping nulls.
    pub fn min_max_i64(&self, column: &str) -> Option<(i64, i64)> {
        let mut bounds: Option<(i64, i64)> = None;
        for row in &self.rows {
            if let Some(v) = row.get(column).and_then(Value::as_i64) {
                bounds = Some(match bounds {
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                    None => (v, v),
                });
            }
        }
        bounds
    }
}

/// Build a `Row` from (column, value) pairs; handy in aggregates and tests.
pub fn row(cells: Vec<(&str, Value)>) -> Row {
    cells
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["country".into(), "year".into(), "rate".into()],
            vec![
                row(vec![
                    ("country", Value::Str("FR".into())),
                    ("year", Value::Str("2010".into())),
                    ("rate", Value::Str("30.5".into())),
                ]),
                row(vec![
                    ("country", Value::Str("DE".into())),
                    ("year", Value::Str("n/a".into())),
                    ("rate", Value::Str("oops".into())),
                ]),
            ],
        )
    }

    #[test]
    fn coercion_turns_unparseable_into_null() {
        let t = sample().coerce_int("year").coerce_float("rate");
        assert_eq!(t.rows[0]["year"], Value::Int(2010));
        assert_eq!(t.rows[0]["rate"], Value::Float(30.5));
        assert_eq!(t.rows[1]["year"], Value::Null);
        assert_eq!(t.rows[1]["rate"], Value::Null);
    }

    #[test]
    fn drop_and_rename_are_tolerant_of_absent_columns() {
        let t = sample()
            .drop_columns(&["DATAFLOW", "rate"])
            .rename_column("geo", "country");
        assert!(!t.has_column("rate"));
        assert!(t.has_column("country"));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn select_columns_keeps_requested_order_and_skips_missing() {
        let t = sample().select_columns(&["year", "country", "missing"]);
        assert_eq!(t.columns, vec!["year".to_string(), "country".to_string()]);
    }

    #[test]
    fn sort_by_orders_null_years_first() {
        let t = sample().coerce_int("year").sort_by(&["year"]);
        assert_eq!(t.rows[0]["country"], Value::Str("DE".into()));
        assert_eq!(t.rows[1]["country"], Value::Str("FR".into()));
    }

    #[test]
    fn min_max_skips_nulls() {
        let t = sample().coerce_int("year");
        assert_eq!(t.min_max_i64("year"), Some((2010, 2010)));
        assert_eq!(Table::empty().min_max_i64("year"), None);
    }
}
