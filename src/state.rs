use std::collections::BTreeSet;

use crate::data::aggregate::{
    default_countries, first_last_delta, income_gap, income_gap_by_country, mean_by,
    panel_for_year, under50_share, year_bounds, TrendDelta,
};
use crate::data::filter::{
    filter_by_countries, filter_by_years, restrict_exam_under_50, restrict_under_50,
};
use crate::data::model::{Table, Value};
use crate::data::Datasets;
use crate::DataError;

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The user-facing selection: a country set and an inclusive year range.
/// An empty country set and a `None` range both mean "no restriction".
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub countries: BTreeSet<String>,
    pub years: Option<(i64, i64)>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One dashboard session: the cleaned datasets plus the current selection,
/// with filtered views recomputed in full on every selection change. The
/// presentation layer reads tables and KPI structs from here and never
/// touches the raw data.
#[derive(Debug, Clone)]
pub struct Session {
    datasets: Datasets,
    selection: Selection,
    filtered: Datasets,
}

impl Session {
    /// Fails only when every dataset is empty; a single missing dataset just
    /// degrades its own views.
    pub fn new(datasets: Datasets) -> Result<Self, DataError> {
        if datasets.all_empty() {
            return Err(DataError::NoData);
        }
        Ok(Session {
            filtered: datasets.clone(),
            datasets,
            selection: Selection::default(),
        })
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The filtered views under the current selection.
    pub fn filtered(&self) -> &Datasets {
        &self.filtered
    }

    pub fn set_countries(&mut self, countries: BTreeSet<String>) {
        self.selection.countries = countries;
        self.refilter();
    }

    pub fn set_year_range(&mut self, years: Option<(i64, i64)>) {
        self.selection.years = years;
        self.refilter();
    }

    fn refilter(&mut self) {
        let (y0, y1) = match self.selection.years {
            Some((a, b)) => (Some(a), Some(b)),
            None => (None, None),
        };
        let apply = |table: &Table| {
            filter_by_years(&filter_by_countries(table, &self.selection.countries), y0, y1)
        };
        self.filtered = Datasets {
            screening: apply(&self.datasets.screening),
            mortality: apply(&self.datasets.mortality),
            exam_income: apply(&self.datasets.exam_income),
        };
    }

    // -- Selector inputs for the presentation layer --

    /// Every country observed in any dataset, ignoring the selection.
    pub fn all_countries(&self) -> BTreeSet<String> {
        let mut countries = BTreeSet::new();
        for table in self.datasets.tables() {
            countries.extend(table.unique_strings("country"));
        }
        countries
    }

    /// Observed [min, max] year across all datasets, ignoring the selection.
    pub fn year_bounds(&self) -> Option<(i64, i64)> {
        year_bounds(&self.datasets.tables())
    }

    /// The `k` most-observed countries, the default multi-select.
    pub fn default_countries(&self, k: usize) -> Vec<String> {
        default_countries(&self.datasets.tables(), k)
    }

    // -- KPIs over the current selection --

    /// Median organized-screening rate at the latest year in range, with its
    /// delta vs the first year.
    pub fn screening_kpi(&self) -> Option<TrendDelta> {
        first_last_delta(&self.filtered.screening, "year", "screening_rate")
    }

    /// Median under-50 mortality at the latest year in range. Explicit
    /// sub-50 bands are preferred; TOTAL rows stand in only when no explicit
    /// band survives the selection.
    pub fn mortality_kpi(&self) -> Option<TrendDelta> {
        let chosen = preferred_mortality_slice(&self.filtered.mortality);
        first_last_delta(&chosen, "year", "mortality_rate")
    }

    /// Q5 − Q1 exam-rate gap among under-50 respondents at the latest survey
    /// year in range, with that year.
    pub fn income_gap_kpi(&self) -> Option<IncomeGapKpi> {
        let sub = restrict_exam_under_50(&self.filtered.exam_income);
        let (_, survey_year) = sub.min_max_i64("year")?;
        income_gap(&sub, survey_year).map(|gap| IncomeGapKpi { gap, survey_year })
    }

    // -- Derived tables for the chart views --

    /// Mean screening rate per (country, year), the overview line chart.
    pub fn screening_trend(&self) -> Table {
        mean_by(&self.filtered.screening, &["country", "year"], "screening_rate")
    }

    /// Mean under-50 mortality per (country, year), TOTAL rows included only
    /// when no explicit band exists in the selection.
    pub fn mortality_trend(&self) -> Table {
        let chosen = preferred_mortality_slice(&self.filtered.mortality);
        mean_by(&chosen, &["country", "year"], "mortality_rate")
    }

    /// Under-50 share of total mortality per (country, year), the burden-
    /// shift view.
    pub fn under50_share_trend(&self) -> Table {
        under50_share(&self.filtered.mortality)
    }

    /// Per-country Q5 − Q1 gap at the latest survey year in range, the
    /// inequality bar chart. `None` when no survey year is in range.
    pub fn income_gap_snapshot(&self) -> Option<(i64, Table)> {
        let sub = restrict_exam_under_50(&self.filtered.exam_income);
        let (_, survey_year) = sub.min_max_i64("year")?;
        Some((survey_year, income_gap_by_country(&sub, survey_year)))
    }

    /// Exam rates for one country at the latest survey year in range, the
    /// income × age heatmap. `None` when the country has no rows there.
    pub fn heatmap_slice(&self, country: &str) -> Option<(i64, Table)> {
        let exam = &self.filtered.exam_income;
        let (_, survey_year) = exam.min_max_i64("year")?;
        let slice = exam.retain(|row| {
            row.get("year").and_then(Value::as_i64) == Some(survey_year)
                && row.get("country").and_then(Value::as_str) == Some(country)
        });
        if slice.is_empty() {
            return None;
        }
        Some((survey_year, slice))
    }

    /// Cross-metric panel for one year, the correlation view. Built from the
    /// full datasets so country coverage is not limited by the selection.
    pub fn panel_for_year(&self, year: i64) -> Table {
        panel_for_year(
            &self.datasets.screening,
            &self.datasets.mortality,
            &self.datasets.exam_income,
            year,
        )
    }
}

/// The under-50 mortality slice with the TOTAL fallback policy applied:
/// explicit sub-50 bands when any survive, TOTAL rows otherwise.
fn preferred_mortality_slice(mortality: &Table) -> Table {
    let sub = restrict_under_50(mortality);
    if !sub.has_column("age") {
        return sub;
    }
    let explicit = sub.retain(|row| row.get("age").and_then(Value::as_str) != Some("TOTAL"));
    if explicit.is_empty() {
        sub
    } else {
        explicit
    }
}

/// The income-gap KPI: gap in percentage points plus the survey year it
/// refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncomeGapKpi {
    pub gap: f64,
    pub survey_year: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{row, Row};

    fn screening_table(rows: Vec<(&str, i64, f64)>) -> Table {
        Table::new(
            vec!["country".into(), "year".into(), "screening_rate".into()],
            rows.into_iter()
                .map(|(c, y, v)| {
                    row(vec![
                        ("country", Value::Str(c.into())),
                        ("year", Value::Int(y)),
                        ("screening_rate", Value::Float(v)),
                    ])
                })
                .collect(),
        )
    }

    fn mortality_row(country: &str, year: i64, age: &str, rate: f64) -> Row {
        row(vec![
            ("country", Value::Str(country.into())),
            ("year", Value::Int(year)),
            ("age", Value::Str(age.into())),
            ("mortality_rate", Value::Float(rate)),
        ])
    }

    #[test]
    fn all_empty_datasets_are_fatal() {
        assert!(matches!(
            Session::new(Datasets::default()),
            Err(DataError::NoData)
        ));
    }

    #[test]
    fn screening_kpi_end_to_end() {
        let datasets = Datasets {
            screening: screening_table(vec![
                ("FR", 2010, 30.0),
                ("FR", 2020, 55.0),
                ("DE", 1995, 20.0), // outside the selected range
            ]),
            ..Datasets::default()
        };
        let mut session = Session::new(datasets).unwrap();
        session.set_countries(["FR".to_string()].into());
        session.set_year_range(Some((2010, 2020)));

        let kpi = session.screening_kpi().unwrap();
        assert_eq!(kpi.last, 55.0);
        assert_eq!(kpi.delta(), 25.0);
        assert_eq!(kpi.first_year, 2010);
        assert_eq!(format!("{:+.1} vs {}", kpi.delta(), kpi.first_year), "+25.0 vs 2010");
    }

    #[test]
    fn empty_selection_result_degrades_to_none_not_error() {
        let datasets = Datasets {
            screening: screening_table(vec![("FR", 2010, 30.0)]),
            ..Datasets::default()
        };
        let mut session = Session::new(datasets).unwrap();
        session.set_countries(["SE".to_string()].into());
        assert!(session.screening_kpi().is_none());
        assert!(session.filtered().screening.is_empty());
        assert!(session.income_gap_kpi().is_none());
    }

    #[test]
    fn mortality_kpi_prefers_explicit_bands_over_total() {
        let datasets = Datasets {
            mortality: Table::new(
                vec!["country".into(), "year".into(), "age".into(), "mortality_rate".into()],
                vec![
                    mortality_row("FR", 2015, "Y45-49", 12.0),
                    mortality_row("FR", 2015, "TOTAL", 40.0),
                ],
            ),
            ..Datasets::default()
        };
        let session = Session::new(datasets).unwrap();
        let kpi = session.mortality_kpi().unwrap();
        assert_eq!(kpi.last, 12.0);

        // The trend view applies the same policy: TOTAL rows stay out.
        let trend = session.mortality_trend();
        assert_eq!(trend.len(), 1);
        assert_eq!(trend.rows[0]["mortality_rate"], Value::Float(12.0));

        // TOTAL-only data: the fallback keeps the KPI available.
        let datasets = Datasets {
            mortality: Table::new(
                vec!["country".into(), "year".into(), "age".into(), "mortality_rate".into()],
                vec![mortality_row("FR", 2015, "TOTAL", 40.0)],
            ),
            ..Datasets::default()
        };
        let session = Session::new(datasets).unwrap();
        assert_eq!(session.mortality_kpi().unwrap().last, 40.0);
    }

    #[test]
    fn selection_changes_recompute_filtered_views() {
        let datasets = Datasets {
            screening: screening_table(vec![("FR", 2010, 30.0), ("DE", 2010, 50.0)]),
            ..Datasets::default()
        };
        let mut session = Session::new(datasets).unwrap();
        assert_eq!(session.filtered().screening.len(), 2);

        session.set_countries(["DE".to_string()].into());
        assert_eq!(session.filtered().screening.len(), 1);

        session.set_countries(BTreeSet::new());
        assert_eq!(session.filtered().screening.len(), 2);
        assert_eq!(session.year_bounds(), Some((2010, 2010)));
        assert_eq!(session.default_countries(1), vec!["DE".to_string()]);
    }
}
