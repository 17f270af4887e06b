//! Group-by mean aggregation

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::table::{Column, Factor, Table};
use crate::errors::{StatsError, StatsResult};

/// One group of a summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    /// Group labels, one per group column
    pub keys: Vec<String>,
    pub mean: f64,
    pub n: usize,
}

/// Mean of a value column per combination of group columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group_columns: Vec<String>,
    pub value_column: String,
    /// Rows in declared (categorical) or natural order of the group columns
    pub rows: Vec<SummaryRow>,
    #[serde(skip)]
    levels: Vec<Vec<String>>,
}

impl GroupSummary {
    /// Mean for an exact key combination, if that group is present
    pub fn mean_of(&self, keys: &[&str]) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.keys.iter().map(String::as_str).eq(keys.iter().copied()))
            .map(|r| r.mean)
    }

    /// Tabular form: one factor per group column (keeping its ordering),
    /// then the mean under the value column's name and the group size `n`.
    pub fn to_table(&self) -> StatsResult<Table> {
        let mut table = Table::new();
        for (g, name) in self.group_columns.iter().enumerate() {
            let labels: Vec<String> = self.rows.iter().map(|r| r.keys[g].clone()).collect();
            let factor = Factor::from_labels(name, &labels, &self.levels[g])?;
            table = table.with_column(name.clone(), Column::Categorical(factor))?;
        }
        table
            .with_column(
                self.value_column.clone(),
                Column::Numeric(self.rows.iter().map(|r| r.mean).collect()),
            )?
            .with_column(
                "n",
                Column::Integer(self.rows.iter().map(|r| r.n as i64).collect()),
            )
    }
}

/// Arithmetic mean of `value_column` per distinct combination of
/// `group_columns`. Combinations with no rows are omitted.
pub fn group_mean(
    table: &Table,
    group_columns: &[&str],
    value_column: &str,
) -> StatsResult<GroupSummary> {
    if group_columns.is_empty() {
        return Err(StatsError::EmptyInput {
            field: "group_columns",
        });
    }
    let values = table.numeric(value_column)?;

    let mut codes = Vec::with_capacity(group_columns.len());
    let mut levels = Vec::with_capacity(group_columns.len());
    for &name in group_columns {
        let (c, l) = table.column(name)?.group_codes();
        codes.push(c);
        levels.push(l);
    }

    // Vec<usize> keys sort lexicographically by level index
    let mut groups: BTreeMap<Vec<usize>, (f64, usize)> = BTreeMap::new();
    for (row, &v) in values.iter().enumerate() {
        let key: Vec<usize> = codes.iter().map(|c| c[row]).collect();
        let entry = groups.entry(key).or_insert((0.0, 0));
        entry.0 += v;
        entry.1 += 1;
    }

    let rows: Vec<SummaryRow> = groups
        .into_iter()
        .map(|(key, (sum, n))| SummaryRow {
            keys: key
                .iter()
                .zip(levels.iter())
                .map(|(&k, l)| l[k].clone())
                .collect(),
            mean: sum / n as f64,
            n,
        })
        .collect();

    debug!(
        ?group_columns,
        value_column,
        groups = rows.len(),
        "group means computed"
    );

    Ok(GroupSummary {
        group_columns: group_columns.iter().map(|s| s.to_string()).collect(),
        value_column: value_column.to_string(),
        rows,
        levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::levels::{apply_order, CategoricalSpec};

    fn table() -> Table {
        let months = ["April", "January", "August", "January", "April", "December"];
        Table::new()
            .with_column(
                "month",
                Column::Text(months.iter().map(|s| s.to_string()).collect()),
            )
            .unwrap()
            .with_column("year", Column::Integer(vec![2019, 2019, 2019, 2020, 2020, 2020]))
            .unwrap()
            .with_column(
                "Hires",
                Column::Numeric(vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]),
            )
            .unwrap()
    }

    #[test]
    fn test_declared_order_not_alphabetical() {
        let t = apply_order(&table(), &CategoricalSpec::months("month")).unwrap();
        let s = group_mean(&t, &["month"], "Hires").unwrap();
        let keys: Vec<&str> = s.rows.iter().map(|r| r.keys[0].as_str()).collect();
        assert_eq!(keys, vec!["January", "April", "August", "December"]);
    }

    #[test]
    fn test_text_column_uses_natural_order() {
        let s = group_mean(&table(), &["month"], "Hires").unwrap();
        let keys: Vec<&str> = s.rows.iter().map(|r| r.keys[0].as_str()).collect();
        assert_eq!(keys, vec!["April", "August", "December", "January"]);
    }

    #[test]
    fn test_two_way_means_and_empty_groups_omitted() {
        let t = apply_order(&table(), &CategoricalSpec::months("month")).unwrap();
        let s = group_mean(&t, &["year", "month"], "Hires").unwrap();

        // 12 months x 2 years declared, only 6 combinations observed
        assert_eq!(s.rows.len(), 6);
        assert_eq!(s.rows[0].keys, vec!["2019", "January"]);
        assert_eq!(s.rows[5].keys, vec!["2020", "December"]);
        assert_eq!(s.mean_of(&["2020", "April"]), Some(50.0));
        assert!(s.rows.iter().all(|r| r.n == 1));
    }

    #[test]
    fn test_mean_value() {
        let s = group_mean(&table(), &["year"], "Hires").unwrap();
        assert_eq!(s.mean_of(&["2019"]), Some(20.0));
        assert_eq!(s.mean_of(&["2020"]), Some(50.0));
        assert_eq!(s.mean_of(&["2021"]), None);
    }

    #[test]
    fn test_to_table_keeps_ordering() {
        let t = apply_order(&table(), &CategoricalSpec::months("month")).unwrap();
        let out = group_mean(&t, &["month"], "Hires").unwrap().to_table().unwrap();
        assert_eq!(out.column_names(), vec!["month", "Hires", "n"]);
        assert_eq!(out.factor("month").unwrap().levels()[0], "January");
        assert_eq!(out.numeric("n").unwrap(), vec![2.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_no_group_columns() {
        assert!(matches!(
            group_mean(&table(), &[], "Hires"),
            Err(StatsError::EmptyInput { .. })
        ));
    }
}
