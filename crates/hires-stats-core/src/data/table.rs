//! In-memory typed table
//!
//! Every transformation returns a new `Table`; nothing is mutated in place,
//! so one base table can feed several independent derived pipelines.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use super::levels::{MONTHS, WEEKDAYS};
use crate::errors::{StatsError, StatsResult};

/// Response column of the hire dataset
pub const HIRES: &str = "Hires";
/// Calendar columns of the hire dataset
pub const DATE: &str = "date";
pub const DAY: &str = "day";
pub const MONTH: &str = "month";
pub const YEAR: &str = "year";

/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Integer,
    Text,
    Categorical,
    Date,
}

/// Categorical column: integer codes into an ordered level list.
///
/// Code 0 is the first declared level, which is the reference level when
/// the column is dummy-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    levels: Vec<String>,
    codes: Vec<usize>,
}

impl Factor {
    /// Build a factor from raw labels and a declared ordering.
    pub fn from_labels(column: &str, labels: &[String], levels: &[String]) -> StatsResult<Self> {
        let index: BTreeMap<&str, usize> = levels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect();
        if index.len() != levels.len() {
            return Err(StatsError::InvalidInput(format!(
                "duplicate level in ordering for column '{column}'"
            )));
        }

        let codes = labels
            .iter()
            .map(|label| {
                index
                    .get(label.as_str())
                    .copied()
                    .ok_or_else(|| StatsError::InvalidLevel {
                        column: column.to_string(),
                        value: label.clone(),
                    })
            })
            .collect::<StatsResult<Vec<_>>>()?;

        Ok(Self {
            levels: levels.to_vec(),
            codes,
        })
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn codes(&self) -> &[usize] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn label(&self, row: usize) -> &str {
        &self.levels[self.codes[row]]
    }

    /// Levels that occur at least once, in declared order
    pub fn observed_levels(&self) -> Vec<String> {
        let mut seen = vec![false; self.levels.len()];
        for &c in &self.codes {
            seen[c] = true;
        }
        self.levels
            .iter()
            .zip(seen)
            .filter(|(_, s)| *s)
            .map(|(l, _)| l.clone())
            .collect()
    }

    fn take(&self, rows: &[usize]) -> Self {
        Self {
            levels: self.levels.clone(),
            codes: rows.iter().map(|&r| self.codes[r]).collect(),
        }
    }
}

/// A typed column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Integer(Vec<i64>),
    Text(Vec<String>),
    Categorical(Factor),
    Date(Vec<NaiveDate>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Integer(v) => v.len(),
            Column::Text(v) => v.len(),
            Column::Categorical(f) => f.len(),
            Column::Date(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Numeric(_) => ColumnKind::Numeric,
            Column::Integer(_) => ColumnKind::Integer,
            Column::Text(_) => ColumnKind::Text,
            Column::Categorical(_) => ColumnKind::Categorical,
            Column::Date(_) => ColumnKind::Date,
        }
    }

    /// Raw label of one cell, used for level matching and display
    pub fn label(&self, row: usize) -> String {
        match self {
            Column::Numeric(v) => v[row].to_string(),
            Column::Integer(v) => v[row].to_string(),
            Column::Text(v) => v[row].clone(),
            Column::Categorical(f) => f.label(row).to_string(),
            Column::Date(v) => v[row].to_string(),
        }
    }

    pub fn labels(&self) -> Vec<String> {
        (0..self.len()).map(|i| self.label(i)).collect()
    }

    fn take(&self, rows: &[usize]) -> Self {
        match self {
            Column::Numeric(v) => Column::Numeric(rows.iter().map(|&r| v[r]).collect()),
            Column::Integer(v) => Column::Integer(rows.iter().map(|&r| v[r]).collect()),
            Column::Text(v) => Column::Text(rows.iter().map(|&r| v[r].clone()).collect()),
            Column::Categorical(f) => Column::Categorical(f.take(rows)),
            Column::Date(v) => Column::Date(rows.iter().map(|&r| v[r]).collect()),
        }
    }

    /// Group codes and their labels.
    ///
    /// Categorical columns follow their declared ordering (unobserved levels
    /// keep their slot); every other kind uses natural order of the distinct
    /// values present.
    pub fn group_codes(&self) -> (Vec<usize>, Vec<String>) {
        match self {
            Column::Categorical(f) => (f.codes.clone(), f.levels.clone()),
            Column::Numeric(v) => {
                let mut distinct = v.clone();
                distinct.sort_by(|a, b| a.total_cmp(b));
                distinct.dedup_by(|a, b| a.total_cmp(b).is_eq());
                let codes = v
                    .iter()
                    .map(|x| distinct.partition_point(|d| d.total_cmp(x).is_lt()))
                    .collect();
                (codes, distinct.iter().map(|d| d.to_string()).collect())
            }
            Column::Integer(v) => natural_codes(v, |x| x.to_string()),
            Column::Text(v) => natural_codes(v, |x| x.clone()),
            Column::Date(v) => natural_codes(v, |x| x.to_string()),
        }
    }

    /// View the column as a factor.
    ///
    /// Integer and text columns get their natural (numeric or lexicographic)
    /// ordering; numeric and date columns cannot be used as factors.
    pub fn to_factor(&self, name: &str) -> StatsResult<Factor> {
        match self {
            Column::Categorical(f) => Ok(f.clone()),
            Column::Integer(_) | Column::Text(_) => {
                let (codes, levels) = self.group_codes();
                Ok(Factor { levels, codes })
            }
            Column::Numeric(_) | Column::Date(_) => Err(StatsError::schema(
                name,
                format!("{:?} column cannot be used as a factor", self.kind()),
            )),
        }
    }
}

fn natural_codes<T: Ord + Clone>(
    values: &[T],
    label: impl Fn(&T) -> String,
) -> (Vec<usize>, Vec<String>) {
    let mut distinct = values.to_vec();
    distinct.sort();
    distinct.dedup();
    let codes = values
        .iter()
        .map(|x| distinct.partition_point(|d| d < x))
        .collect();
    (codes, distinct.iter().map(label).collect())
}

/// One day of hires with its policy indicators and calendar attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub hires: f64,
    pub policies: BTreeMap<String, bool>,
    pub day: String,
    pub month: String,
    pub year: i32,
}

impl Observation {
    /// Build an observation, deriving weekday, month and year from the date.
    pub fn new(date: NaiveDate, hires: f64, policies: BTreeMap<String, bool>) -> Self {
        Self {
            date,
            hires,
            policies,
            day: WEEKDAYS[date.weekday().num_days_from_monday() as usize].to_string(),
            month: MONTHS[date.month0() as usize].to_string(),
            year: date.year(),
        }
    }
}

/// Ordered collection of equally long named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<(String, Column)>,
    n_rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column, returning the extended table.
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> StatsResult<Self> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(StatsError::InvalidInput(format!(
                "column '{name}' already exists"
            )));
        }
        if !self.columns.is_empty() && column.len() != self.n_rows {
            return Err(StatsError::DimensionMismatch {
                expected: self.n_rows,
                found: column.len(),
            });
        }
        self.n_rows = column.len();
        self.columns.push((name, column));
        Ok(self)
    }

    /// Lay out observations in the canonical hire schema.
    ///
    /// Every observation must carry every flag in `policies`; flags become
    /// numeric 0/1 columns.
    pub fn from_observations(observations: &[Observation], policies: &[&str]) -> StatsResult<Self> {
        let mut flags = Vec::with_capacity(policies.len());
        for &policy in policies {
            let values = observations
                .iter()
                .map(|o| {
                    o.policies
                        .get(policy)
                        .map(|&on| if on { 1.0 } else { 0.0 })
                        .ok_or_else(|| {
                            StatsError::schema(policy, format!("missing on {}", o.date))
                        })
                })
                .collect::<StatsResult<Vec<f64>>>()?;
            flags.push((policy, values));
        }

        let mut table = Table::new()
            .with_column(DATE, Column::Date(observations.iter().map(|o| o.date).collect()))?
            .with_column(HIRES, Column::Numeric(observations.iter().map(|o| o.hires).collect()))?;
        for (policy, values) in flags {
            table = table.with_column(policy, Column::Numeric(values))?;
        }
        table
            .with_column(DAY, Column::Text(observations.iter().map(|o| o.day.clone()).collect()))?
            .with_column(MONTH, Column::Text(observations.iter().map(|o| o.month.clone()).collect()))?
            .with_column(YEAR, Column::Integer(observations.iter().map(|o| o.year as i64).collect()))
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn column(&self, name: &str) -> StatsResult<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or_else(|| StatsError::schema(name, "column is absent"))
    }

    /// Values of a numeric or integer column as `f64`
    pub fn numeric(&self, name: &str) -> StatsResult<Vec<f64>> {
        match self.column(name)? {
            Column::Numeric(v) => Ok(v.clone()),
            Column::Integer(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            other => Err(StatsError::schema(
                name,
                format!("expected a numeric column, found {:?}", other.kind()),
            )),
        }
    }

    pub fn factor(&self, name: &str) -> StatsResult<Factor> {
        self.column(name)?.to_factor(name)
    }

    pub fn dates(&self, name: &str) -> StatsResult<&[NaiveDate]> {
        match self.column(name)? {
            Column::Date(v) => Ok(v),
            other => Err(StatsError::schema(
                name,
                format!("expected a date column, found {:?}", other.kind()),
            )),
        }
    }

    /// Check that each named column exists with one of the accepted kinds.
    pub fn require(&self, required: &[(&str, &[ColumnKind])]) -> StatsResult<()> {
        for &(name, kinds) in required {
            let kind = self.column(name)?.kind();
            if !kinds.contains(&kind) {
                return Err(StatsError::schema(
                    name,
                    format!("expected one of {kinds:?}, found {kind:?}"),
                ));
            }
        }
        Ok(())
    }

    /// Validate the hire dataset schema: calendar columns, a non-negative
    /// response and 0/1 policy flags.
    pub fn require_hire_schema(&self, policies: &[String]) -> StatsResult<()> {
        use ColumnKind::*;
        let categorical: &[ColumnKind] = &[Text, Categorical];
        self.require(&[
            (DATE, &[Date]),
            (HIRES, &[Numeric, Integer]),
            (DAY, categorical),
            (MONTH, categorical),
            (YEAR, &[Integer, Categorical]),
        ])?;

        if self.numeric(HIRES)?.iter().any(|h| h.is_nan() || *h < 0.0) {
            return Err(StatsError::schema(HIRES, "hires must be non-negative"));
        }
        for policy in policies {
            self.require(&[(policy.as_str(), &[Numeric, Integer])])?;
            if self.numeric(policy)?.iter().any(|v| *v != 0.0 && *v != 1.0) {
                return Err(StatsError::schema(policy, "policy flags must be 0 or 1"));
            }
        }
        Ok(())
    }

    /// New table holding the given rows, in the given order
    pub fn take(&self, rows: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|(n, c)| (n.clone(), c.take(rows)))
                .collect(),
            n_rows: rows.len(),
        }
    }

    /// New table holding the rows for which `keep` returns true
    pub fn filter_rows(&self, keep: impl Fn(usize) -> bool) -> Self {
        let rows: Vec<usize> = (0..self.n_rows).filter(|&i| keep(i)).collect();
        self.take(&rows)
    }

    /// New table with one column swapped for another of the same length
    pub fn replace_column(&self, name: &str, column: Column) -> StatsResult<Self> {
        if column.len() != self.n_rows {
            return Err(StatsError::DimensionMismatch {
                expected: self.n_rows,
                found: column.len(),
            });
        }
        let mut out = self.clone();
        let slot = out
            .columns
            .iter_mut()
            .find(|(n, _)| n == name)
            .ok_or_else(|| StatsError::schema(name, "column is absent"))?;
        slot.1 = column;
        Ok(out)
    }

    /// Derive a two-level period factor: rows dated before `cutoff` get
    /// `labels[0]`, the rest `labels[1]`.
    pub fn with_period_flag(
        &self,
        name: &str,
        date_column: &str,
        cutoff: NaiveDate,
        labels: [&str; 2],
    ) -> StatsResult<Self> {
        let levels = vec![labels[0].to_string(), labels[1].to_string()];
        let codes = self
            .dates(date_column)?
            .iter()
            .map(|d| usize::from(*d >= cutoff))
            .collect();
        self.clone()
            .with_column(name, Column::Categorical(Factor { levels, codes }))
    }

    /// Drop declared levels with no remaining rows, keeping declared order.
    pub fn drop_unused_levels(&self, name: &str) -> StatsResult<Self> {
        match self.column(name)? {
            Column::Categorical(f) => {
                let observed = f.observed_levels();
                let trimmed = Factor::from_labels(name, &self.column(name)?.labels(), &observed)?;
                self.replace_column(name, Column::Categorical(trimmed))
            }
            other => Err(StatsError::schema(
                name,
                format!("expected a categorical column, found {:?}", other.kind()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Table {
        let obs: Vec<Observation> = [
            (date(2019, 6, 1), 100.0, false),
            (date(2019, 6, 2), 120.0, false),
            (date(2020, 6, 1), 40.0, true),
            (date(2020, 6, 2), 60.0, true),
        ]
        .into_iter()
        .map(|(d, h, wfh)| Observation::new(d, h, BTreeMap::from([("wfh".to_string(), wfh)])))
        .collect();
        Table::from_observations(&obs, &["wfh"]).unwrap()
    }

    #[test]
    fn test_observation_calendar() {
        let o = Observation::new(date(2020, 3, 23), 1.0, BTreeMap::new());
        assert_eq!(o.day, "Monday");
        assert_eq!(o.month, "March");
        assert_eq!(o.year, 2020);
    }

    #[test]
    fn test_from_observations_schema() {
        let t = sample();
        assert_eq!(t.n_rows(), 4);
        assert_eq!(t.column_names(), vec!["date", "Hires", "wfh", "day", "month", "year"]);
        assert_eq!(t.numeric("wfh").unwrap(), vec![0.0, 0.0, 1.0, 1.0]);
        assert!(t.require_hire_schema(&["wfh".to_string()]).is_ok());
    }

    #[test]
    fn test_missing_policy_flag() {
        let obs = vec![Observation::new(date(2020, 1, 1), 5.0, BTreeMap::new())];
        let result = Table::from_observations(&obs, &["wfh"]);
        assert!(matches!(result, Err(StatsError::Schema { .. })));
    }

    #[test]
    fn test_schema_errors() {
        let t = sample();
        assert!(matches!(t.column("curfew"), Err(StatsError::Schema { .. })));
        assert!(matches!(t.numeric("day"), Err(StatsError::Schema { .. })));

        let bad = t
            .replace_column(HIRES, Column::Numeric(vec![1.0, -1.0, 2.0, 3.0]))
            .unwrap();
        assert!(matches!(
            bad.require_hire_schema(&[]),
            Err(StatsError::Schema { .. })
        ));

        let flag = t
            .replace_column("wfh", Column::Numeric(vec![0.0, 2.0, 1.0, 1.0]))
            .unwrap();
        assert!(flag.require_hire_schema(&["wfh".to_string()]).is_err());
    }

    #[test]
    fn test_length_mismatch() {
        let result = Table::new()
            .with_column("a", Column::Numeric(vec![1.0, 2.0]))
            .unwrap()
            .with_column("b", Column::Numeric(vec![1.0]));
        assert!(matches!(result, Err(StatsError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_filter_rows_is_non_destructive() {
        let t = sample();
        let sub = t.filter_rows(|i| i >= 2);
        assert_eq!(sub.n_rows(), 2);
        assert_eq!(t.n_rows(), 4);
        assert_eq!(sub.numeric(HIRES).unwrap(), vec![40.0, 60.0]);
    }

    #[test]
    fn test_integer_group_codes_natural_order() {
        let c = Column::Integer(vec![2020, 2019, 2021, 2019]);
        let (codes, labels) = c.group_codes();
        assert_eq!(labels, vec!["2019", "2020", "2021"]);
        assert_eq!(codes, vec![1, 0, 2, 0]);
    }

    #[test]
    fn test_period_flag() {
        let t = sample()
            .with_period_flag("period", DATE, date(2020, 3, 23), ["Pre-COVID", "COVID"])
            .unwrap();
        let f = t.factor("period").unwrap();
        assert_eq!(f.codes(), &[0, 0, 1, 1]);
        assert_eq!(f.levels()[0], "Pre-COVID");
    }

    #[test]
    fn test_numeric_not_a_factor() {
        let t = sample();
        assert!(matches!(t.factor(HIRES), Err(StatsError::Schema { .. })));
    }
}
