//! Estimated marginal means and pairwise contrasts
//!
//! The marginal mean of a factor level is the prediction at a reference
//! grid: the factor fixed at that level, numeric covariates at their sample
//! mean, and every other factor averaged uniformly over its levels. Each
//! mean is a linear combination cᵗβ with variance cᵗΣc, and a contrast
//! between two levels uses the difference of their combinations, so the
//! covariance between the two means is accounted for.

use faer::Mat;
use tracing::{debug, info};

use super::design::{dummies, Encoding};
use super::ols::FittedModel;
use crate::errors::{StatsError, StatsResult};
use crate::inference::{t_critical, t_two_sided_p};
use crate::types::{Adjustment, ContrastRow, EmmOptions, EmmRow};

/// Marginal means of one factor, with what is needed to contrast them
#[derive(Debug, Clone)]
pub struct EmmTable {
    pub factor: String,
    pub rows: Vec<EmmRow>,
    pub confidence_level: f64,
    /// Linear combination per level, in design-column order
    weights: Vec<Vec<f64>>,
    covariance: Mat<f64>,
    df: usize,
}

fn quadratic_form(c: &[f64], cov: &Mat<f64>) -> f64 {
    let mut total = 0.0;
    for (i, ci) in c.iter().enumerate() {
        if *ci == 0.0 {
            continue;
        }
        for (j, cj) in c.iter().enumerate() {
            total += ci * cov[(i, j)] * cj;
        }
    }
    total
}

/// Marginal means of `factor` for every declared level.
///
/// # Errors
/// * `Schema` if `factor` is not a categorical variable of the model
pub fn marginal_means(
    model: &FittedModel,
    factor: &str,
    options: &EmmOptions,
) -> StatsResult<EmmTable> {
    let info = model.design_info();
    let levels = match info.encodings.get(factor) {
        Some(Encoding::Factor { levels }) => levels.clone(),
        Some(Encoding::Numeric { .. }) => {
            return Err(StatsError::schema(
                factor,
                "marginal means need a categorical model variable",
            ))
        }
        None => return Err(StatsError::schema(factor, "not a variable of the model")),
    };

    let df = model.df_residual();
    let crit = t_critical(df as f64, options.confidence_level)?;
    let beta = model.coefficients();
    let cov = model.covariance();

    let mut weights = Vec::with_capacity(levels.len());
    let mut rows = Vec::with_capacity(levels.len());
    for (idx, level) in levels.iter().enumerate() {
        let c = info.expand_row(|name| {
            if name == factor {
                return dummies(levels.len(), idx);
            }
            match &info.encodings[name] {
                Encoding::Numeric { mean } => vec![*mean],
                Encoding::Factor { levels } => {
                    vec![1.0 / levels.len() as f64; levels.len() - 1]
                }
            }
        });

        let estimate: f64 = c.iter().zip(beta.iter()).map(|(ci, bi)| ci * bi).sum();
        let std_error = quadratic_form(&c, cov).max(0.0).sqrt();
        rows.push(EmmRow {
            level: level.clone(),
            estimate,
            std_error,
            df,
            ci_lower: estimate - crit * std_error,
            ci_upper: estimate + crit * std_error,
        });
        weights.push(c);
    }

    debug!(factor, levels = rows.len(), "marginal means computed");

    Ok(EmmTable {
        factor: factor.to_string(),
        rows,
        confidence_level: options.confidence_level,
        weights,
        covariance: cov.clone(),
        df,
    })
}

impl EmmTable {
    /// Marginal mean row for a level
    pub fn get(&self, level: &str) -> Option<&EmmRow> {
        self.rows.iter().find(|r| r.level == level)
    }

    /// All pairwise contrasts `later - earlier` in declared level order.
    pub fn contrasts(&self, adjustment: Adjustment) -> StatsResult<Vec<ContrastRow>> {
        let k = self.rows.len();
        if k < 2 {
            return Err(StatsError::insufficient("pairwise contrasts", 2, k));
        }
        let m = (k * (k - 1) / 2) as f64;
        let level = match adjustment {
            Adjustment::None => self.confidence_level,
            Adjustment::Bonferroni => 1.0 - (1.0 - self.confidence_level) / m,
            Adjustment::Sidak => self.confidence_level.powf(1.0 / m),
        };
        let df = self.df as f64;
        let crit = t_critical(df, level)?;

        let mut out = Vec::with_capacity(k * (k - 1) / 2);
        for i in 0..k {
            for j in (i + 1)..k {
                let d: Vec<f64> = self.weights[j]
                    .iter()
                    .zip(self.weights[i].iter())
                    .map(|(a, b)| a - b)
                    .collect();
                let estimate = self.rows[j].estimate - self.rows[i].estimate;
                let std_error = quadratic_form(&d, &self.covariance).max(0.0).sqrt();
                let t_ratio = estimate / std_error;
                let raw = t_two_sided_p(t_ratio, df)?;
                let p_value = match adjustment {
                    Adjustment::None => raw,
                    Adjustment::Bonferroni => (raw * m).min(1.0),
                    Adjustment::Sidak => 1.0 - (1.0 - raw).powf(m),
                };
                out.push(ContrastRow {
                    level: self.rows[j].level.clone(),
                    baseline: self.rows[i].level.clone(),
                    estimate,
                    std_error,
                    df: self.df,
                    t_ratio,
                    p_value,
                    ci_lower: estimate - crit * std_error,
                    ci_upper: estimate + crit * std_error,
                    adjustment,
                });
            }
        }

        info!(
            factor = %self.factor,
            contrasts = out.len(),
            ?adjustment,
            "pairwise contrasts computed"
        );
        Ok(out)
    }
}
