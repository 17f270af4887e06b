//! Group-wise outlier removal
//!
//! Rows are kept when their value lies within `width` sample standard
//! deviations of their group's mean. Statistics are computed per group on
//! the table passed in, so each call is independent of any earlier filter.

use serde::Serialize;
use tracing::{debug, warn};

use super::table::Table;
use crate::errors::StatsResult;
use crate::types::OutlierOptions;

/// Bounds computed for one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBounds {
    pub group: String,
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation (NaN for groups of fewer than two rows)
    pub std_dev: f64,
    /// `None` when the group is too small to have a standard deviation
    pub bounds: Option<(f64, f64)>,
}

impl GroupBounds {
    pub fn contains(&self, value: f64) -> bool {
        match self.bounds {
            Some((lower, upper)) => lower <= value && value <= upper,
            None => true,
        }
    }
}

/// Per-group mean ± width·sd bounds of `value_column`, in group order
pub fn group_bounds(
    table: &Table,
    group_column: &str,
    value_column: &str,
    options: &OutlierOptions,
) -> StatsResult<(Vec<usize>, Vec<GroupBounds>)> {
    let values = table.numeric(value_column)?;
    let (codes, labels) = table.column(group_column)?.group_codes();

    let mut members: Vec<Vec<f64>> = vec![Vec::new(); labels.len()];
    for (&code, &v) in codes.iter().zip(values.iter()) {
        members[code].push(v);
    }

    let bounds = labels
        .into_iter()
        .zip(members)
        .map(|(group, xs)| {
            let n = xs.len();
            let mean = if n > 0 {
                xs.iter().sum::<f64>() / n as f64
            } else {
                f64::NAN
            };
            let (std_dev, bounds) = if n >= 2 {
                let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
                let sd = var.sqrt();
                (sd, Some((mean - options.width * sd, mean + options.width * sd)))
            } else {
                (f64::NAN, None)
            };
            GroupBounds {
                group,
                n,
                mean,
                std_dev,
                bounds,
            }
        })
        .collect();

    Ok((codes, bounds))
}

/// Remove rows outside their group's bounds, returning a new table.
pub fn filter_outliers(
    table: &Table,
    group_column: &str,
    value_column: &str,
    options: &OutlierOptions,
) -> StatsResult<Table> {
    filter_outliers_with_bounds(table, group_column, value_column, options).map(|(t, _)| t)
}

/// Like [`filter_outliers`], also returning the bounds the filter applied.
pub fn filter_outliers_with_bounds(
    table: &Table,
    group_column: &str,
    value_column: &str,
    options: &OutlierOptions,
) -> StatsResult<(Table, Vec<GroupBounds>)> {
    let (codes, bounds) = group_bounds(table, group_column, value_column, options)?;
    let values = table.numeric(value_column)?;

    for b in bounds.iter().filter(|b| b.n > 0 && b.bounds.is_none()) {
        warn!(
            group = %b.group,
            n = b.n,
            "group too small for a standard deviation; rows retained unfiltered"
        );
    }

    let keep: Vec<usize> = (0..table.n_rows())
        .filter(|&i| bounds[codes[i]].contains(values[i]))
        .collect();

    debug!(
        group_column,
        value_column,
        removed = table.n_rows() - keep.len(),
        retained = keep.len(),
        "outlier filter applied"
    );
    Ok((table.take(&keep), bounds))
}
