/// Data layer: table model, loading, cleaning, filtering, aggregation.
///
/// Architecture:
/// ```text
///  three raw .csv files
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table (cell types guessed)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  clean    │  drop metadata cols, filter, rename, coerce, sort
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │   Datasets    │  screening / mortality / exam_income tables
///   └──────────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ filter, aggregate │  country/year predicates → derived tables, KPIs
///   └──────────────────┘
/// ```
pub mod aggregate;
pub mod clean;
pub mod filter;
pub mod loader;
pub mod model;

use model::Table;

/// The three cleaned source tables for one session. A table that failed to
/// load is simply empty; downstream views degrade to "no data" for it.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub screening: Table,
    pub mortality: Table,
    pub exam_income: Table,
}

impl Datasets {
    pub fn all_empty(&self) -> bool {
        self.screening.is_empty() && self.mortality.is_empty() && self.exam_income.is_empty()
    }

    /// The tables in a fixed order, for cross-dataset scans (year bounds,
    /// country lists).
    pub fn tables(&self) -> [&Table; 3] {
        [&self.screening, &self.mortality, &self.exam_income]
    }
}
