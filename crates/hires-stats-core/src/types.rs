use serde::{Deserialize, Serialize};

/// Options for the group-wise outlier filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierOptions {
    /// Half-width of the retained band, in sample standard deviations
    pub width: f64,
}

impl Default for OutlierOptions {
    fn default() -> Self {
        Self { width: 2.0 }
    }
}

/// Options for OLS fitting
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// A design column is treated as linearly dependent when the norm left
    /// after projecting out earlier columns is below this fraction of its
    /// own norm
    pub rank_tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            rank_tolerance: 1e-7,
        }
    }
}

/// Options for nested model comparison
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Significance threshold for the `significant` flag (default: 0.05)
    pub significance_level: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
        }
    }
}

/// Multiple-comparison adjustment for pairwise contrasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Unadjusted (least significant difference)
    #[default]
    None,
    /// p·m, intervals at level 1 - α/m
    Bonferroni,
    /// 1 - (1 - p)^m, intervals at level (1 - α)^(1/m)
    Sidak,
}

/// Options for estimated marginal means
#[derive(Debug, Clone)]
pub struct EmmOptions {
    /// Confidence level for mean and contrast intervals (default: 0.95)
    pub confidence_level: f64,
}

impl Default for EmmOptions {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
        }
    }
}

/// One row of a fitted model's coefficient table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientRow {
    /// Design column name, e.g. `(Intercept)`, `wfh`, `month[March]`
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    /// Two-sided p-value for H0: coefficient = 0
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Nested-model F-test outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FTestResult {
    pub f_statistic: f64,
    /// Difference in residual degrees of freedom
    pub df1: usize,
    /// Residual degrees of freedom of the full model
    pub df2: usize,
    pub p_value: f64,
    pub rss_restricted: f64,
    pub rss_full: f64,
    /// `p_value < significance_level`
    pub significant: bool,
    pub significance_level: f64,
}

/// Estimated marginal mean for one factor level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmmRow {
    pub level: String,
    pub estimate: f64,
    pub std_error: f64,
    pub df: usize,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Pairwise difference between two marginal means: `level - baseline`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContrastRow {
    pub level: String,
    /// The level earlier in declared order
    pub baseline: String,
    pub estimate: f64,
    pub std_error: f64,
    pub df: usize,
    pub t_ratio: f64,
    /// Two-sided p-value after adjustment
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub adjustment: Adjustment,
}
