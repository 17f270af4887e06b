//! Categorical level ordering
//!
//! A `CategoricalSpec` is passed explicitly to `apply_order`, which returns a
//! new table whose column is a factor coded against the declared ordering.
//! Grouping, sorting and dummy encoding all follow that ordering, with the
//! first level as the model reference level.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::table::{Column, Factor, Table};
use crate::errors::{StatsError, StatsResult};

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Declared level ordering for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalSpec {
    pub name: String,
    pub ordered_levels: Vec<String>,
}

impl CategoricalSpec {
    pub fn new<S: AsRef<str>>(name: &str, ordered_levels: &[S]) -> Self {
        Self {
            name: name.to_string(),
            ordered_levels: ordered_levels.iter().map(|l| l.as_ref().to_string()).collect(),
        }
    }

    /// Ordering of the levels actually present in `column`, natural order
    pub fn natural(table: &Table, column: &str) -> StatsResult<Self> {
        let (_, labels) = table.column(column)?.group_codes();
        Ok(Self::new(column, &labels))
    }

    /// Monday..Sunday
    pub fn weekdays(column: &str) -> Self {
        Self::new(column, &WEEKDAYS)
    }

    /// January..December
    pub fn months(column: &str) -> Self {
        Self::new(column, &MONTHS)
    }
}

/// Re-code `spec.name` as a factor with the declared ordering.
///
/// Fails with `InvalidLevel` if any observed value is missing from the
/// ordering. Date columns cannot be ordered.
pub fn apply_order(table: &Table, spec: &CategoricalSpec) -> StatsResult<Table> {
    let column = table.column(&spec.name)?;
    if matches!(column, Column::Date(_)) {
        return Err(StatsError::schema(
            &spec.name,
            "date columns cannot carry a level ordering",
        ));
    }

    let factor = Factor::from_labels(&spec.name, &column.labels(), &spec.ordered_levels)?;
    debug!(
        column = %spec.name,
        levels = spec.ordered_levels.len(),
        "applied categorical ordering"
    );
    table.replace_column(&spec.name, Column::Categorical(factor))
}

/// Apply several orderings in sequence
pub fn apply_orders(table: &Table, specs: &[CategoricalSpec]) -> StatsResult<Table> {
    specs
        .iter()
        .try_fold(table.clone(), |acc, spec| apply_order(&acc, spec))
}
