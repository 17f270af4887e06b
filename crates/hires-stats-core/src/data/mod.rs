//! Tabular data, categorical orderings, outlier filtering and aggregation

pub mod aggregate;
pub mod levels;
pub mod outliers;
pub mod table;

pub use aggregate::{group_mean, GroupSummary, SummaryRow};
pub use levels::{apply_order, apply_orders, CategoricalSpec, MONTHS, WEEKDAYS};
pub use outliers::{filter_outliers, filter_outliers_with_bounds, group_bounds, GroupBounds};
pub use table::{Column, ColumnKind, Factor, Observation, Table, DATE, DAY, HIRES, MONTH, YEAR};
