//! Statistical hypothesis testing
//!
//! - Welch two-sample t-test
//! - Pearson correlation test and correlation matrices

pub mod parametric;

pub use correlation::{correlation_matrix, pearson, PearsonOptions};
pub use parametric::{welch_t_test, WelchOptions};

use serde::Serialize;

use crate::{StatsError, StatsResult};

/// Welch two-sample t-test result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WelchResult {
    /// t statistic for H0: mean(a) = mean(b)
    pub t_statistic: f64,
    /// Welch–Satterthwaite degrees of freedom
    pub df: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// mean(a) - mean(b)
    pub mean_diff: f64,
    /// Confidence interval for the mean difference
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub confidence_level: f64,
    /// Group 1 sample size
    pub n1: usize,
    /// Group 2 sample size
    pub n2: usize,
}

/// Correlation test result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    /// Correlation coefficient
    pub r: f64,
    /// t statistic r·√((n-2)/(1-r²))
    pub statistic: f64,
    /// Two-sided p-value (n-2 degrees of freedom)
    pub p_value: f64,
    /// Fisher z confidence interval
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub confidence_level: f64,
    /// Sample size
    pub n: usize,
}

/// Pairwise Pearson correlations over a set of columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// r[i][j]; symmetric with unit diagonal
    pub r: Vec<Vec<f64>>,
    /// p[i][j]; zero on the diagonal
    pub p: Vec<Vec<f64>>,
    /// Fisher z interval bounds per pair; one on the diagonal
    pub ci_lower: Vec<Vec<f64>>,
    pub ci_upper: Vec<Vec<f64>>,
    pub confidence_level: f64,
    pub n: usize,
}

impl CorrelationMatrix {
    /// (r, p) for a named pair
    pub fn get(&self, a: &str, b: &str) -> Option<(f64, f64)> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some((self.r[i][j], self.p[i][j]))
    }
}

/// Reject NaN and infinite values rather than dropping them
fn check_finite(data: &[f64], field: &str) -> StatsResult<()> {
    if data.iter().any(|x| !x.is_finite()) {
        return Err(StatsError::InvalidInput(format!(
            "{field} contains non-finite values"
        )));
    }
    Ok(())
}

/// Map backend test errors into the crate error type
fn convert_error(e: anofox_tests::StatError) -> StatsError {
    StatsError::InvalidInput(e.to_string())
}

fn is_constant(data: &[f64]) -> bool {
    data.iter().all(|v| *v == data[0])
}
