//! mammostat – the data core behind a European breast-cancer analytics
//! dashboard.
//!
//! Three Eurostat-style CSV extracts (organized-screening participation,
//! female breast-cancer mortality, self-reported exam rates by income
//! quintile) are loaded once, cleaned, and held in memory. A [`Session`]
//! then applies the user's country/year selection and serves derived tables
//! and KPI scalars to the presentation layer, which does all rendering.
//!
//! Every transformation is pure: filters and aggregates return new tables,
//! missing columns make the affected step a no-op, and thin slices come back
//! as empty tables or `None` rather than errors. The only fatal condition is
//! all three datasets failing to load.

pub mod data;
pub mod state;

pub use data::loader::load_datasets;
pub use data::model::{Table, Value};
pub use data::Datasets;
pub use state::{IncomeGapKpi, Selection, Session};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    /// Every dataset failed to load; there is nothing to show.
    #[error("no data available: screening, mortality and exam datasets are all empty")]
    NoData,
}
