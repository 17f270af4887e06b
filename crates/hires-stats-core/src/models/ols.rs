//! Ordinary Least Squares (OLS) via QR
//!
//! The design matrix is factored as X = QR with faer, without forming XᵗX.
//! A column whose R diagonal is negligible relative to its own norm is
//! linearly dependent on earlier columns, and the fit is refused rather than
//! returning an arbitrary solution.

use faer::Mat;
use tracing::{debug, info};

use super::design::{build_design, DesignInfo, ModelSpec};
use crate::data::table::Table;
use crate::errors::{StatsError, StatsResult};
use crate::inference::{f_upper_p, t_critical, t_two_sided_p};
use crate::types::{CoefficientRow, FitOptions};

/// Immutable result of one least-squares fit
#[derive(Debug, Clone)]
pub struct FittedModel {
    info: DesignInfo,
    coefficients: Vec<f64>,
    /// σ²·(XᵗX)⁻¹
    covariance: Mat<f64>,
    response: Vec<f64>,
    fitted: Vec<f64>,
    residuals: Vec<f64>,
    rss: f64,
    tss: f64,
    df_residual: usize,
}

struct QrSolution {
    coefficients: Mat<f64>,
    /// (XᵗX)⁻¹ = R⁻¹R⁻ᵗ
    unscaled_covariance: Mat<f64>,
}

/// Least squares through faer's thin QR; fails on the first dependent column.
fn qr_solve(
    x: &Mat<f64>,
    y: &[f64],
    column_names: &[String],
    tolerance: f64,
) -> StatsResult<QrSolution> {
    let n = x.nrows();
    let p = x.ncols();

    let qr = x.qr();
    let r = qr.compute_thin_r();

    // |r_kk| is the part of column k not explained by columns 0..k
    let independent = |k: usize| {
        let norm = x.col(k).norm_l2();
        k < r.nrows() && norm > 0.0 && r[(k, k)].abs() > tolerance * norm
    };
    if let Some(k) = (0..p).find(|&k| !independent(k)) {
        return Err(StatsError::RankDeficiency {
            column: column_names[k].clone(),
            rank: (0..p).filter(|&k| independent(k)).count(),
            columns: p,
        });
    }

    // β = R⁻¹Qᵗy
    let y = Mat::from_fn(n, 1, |i, _| y[i]);
    let mut coefficients = qr.compute_thin_q().transpose() * &y;
    r.solve_upper_triangular_in_place(&mut coefficients);

    let mut r_inv = Mat::<f64>::identity(p, p);
    r.solve_upper_triangular_in_place(&mut r_inv);
    let unscaled_covariance = r_inv.as_ref() * r_inv.transpose();

    Ok(QrSolution {
        coefficients,
        unscaled_covariance,
    })
}

/// Fit `spec.response ~ spec.terms` by least squares.
///
/// # Errors
/// * `Schema` / `InvalidLevel` from design-matrix construction
/// * `RankDeficiency` if the design columns are linearly dependent
/// * `InsufficientData` if no residual degrees of freedom remain
pub fn fit_ols(table: &Table, spec: &ModelSpec, options: &FitOptions) -> StatsResult<FittedModel> {
    let design = build_design(table, spec)?;
    let n = design.x.nrows();
    let p = design.x.ncols();

    if n == 0 {
        return Err(StatsError::EmptyInput { field: "table" });
    }

    let solution = qr_solve(
        &design.x,
        &design.y,
        &design.info.column_names,
        options.rank_tolerance,
    )?;

    if n <= p {
        return Err(StatsError::insufficient(
            "residual degrees of freedom",
            p + 1,
            n,
        ));
    }
    let df_residual = n - p;

    let fitted_col = &design.x * &solution.coefficients;
    let fitted: Vec<f64> = (0..n).map(|i| fitted_col[(i, 0)]).collect();
    let residuals: Vec<f64> = design
        .y
        .iter()
        .zip(fitted.iter())
        .map(|(yi, fi)| yi - fi)
        .collect();
    let rss: f64 = residuals.iter().map(|r| r * r).sum();
    let y_mean = design.y.iter().sum::<f64>() / n as f64;
    let tss: f64 = design.y.iter().map(|yi| (yi - y_mean).powi(2)).sum();

    let sigma2 = rss / df_residual as f64;
    let covariance = &solution.unscaled_covariance * faer::scale(sigma2);
    let coefficients: Vec<f64> = (0..p).map(|j| solution.coefficients[(j, 0)]).collect();

    info!(
        response = %spec.response,
        n,
        rank = p,
        rss,
        df_residual,
        "OLS fit complete"
    );

    Ok(FittedModel {
        info: design.info,
        coefficients,
        covariance,
        response: design.y,
        fitted,
        residuals,
        rss,
        tss,
        df_residual,
    })
}

impl FittedModel {
    pub fn spec(&self) -> &ModelSpec {
        &self.info.spec
    }

    pub fn design_info(&self) -> &DesignInfo {
        &self.info
    }

    pub fn column_names(&self) -> &[String] {
        &self.info.column_names
    }

    /// Coefficients in design-column order, intercept first
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Coefficient for a named design column
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.info
            .column_names
            .iter()
            .position(|c| c == name)
            .map(|j| self.coefficients[j])
    }

    pub fn covariance(&self) -> &Mat<f64> {
        &self.covariance
    }

    pub fn response(&self) -> &[f64] {
        &self.response
    }

    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn rss(&self) -> f64 {
        self.rss
    }

    pub fn n_observations(&self) -> usize {
        self.response.len()
    }

    /// Rank of the design matrix (equal to its column count)
    pub fn rank(&self) -> usize {
        self.coefficients.len()
    }

    pub fn df_residual(&self) -> usize {
        self.df_residual
    }

    /// Residual standard error √(RSS/df)
    pub fn sigma(&self) -> f64 {
        (self.rss / self.df_residual as f64).sqrt()
    }

    pub fn r_squared(&self) -> f64 {
        if self.tss > 0.0 {
            1.0 - self.rss / self.tss
        } else {
            1.0
        }
    }

    pub fn adj_r_squared(&self) -> f64 {
        let n = self.n_observations() as f64;
        1.0 - (1.0 - self.r_squared()) * (n - 1.0) / self.df_residual as f64
    }

    /// Overall F-test against the intercept-only model.
    ///
    /// Returns `None` for an intercept-only model.
    pub fn f_statistic(&self) -> StatsResult<Option<(f64, f64)>> {
        let df1 = self.rank() - 1;
        if df1 == 0 {
            return Ok(None);
        }
        let df2 = self.df_residual as f64;
        let f = ((self.tss - self.rss).max(0.0) / df1 as f64) / (self.rss / df2);
        let p = f_upper_p(f, df1 as f64, df2)?;
        Ok(Some((f, p)))
    }

    /// Estimate, standard error, t-value, p-value and interval per design column
    pub fn coefficient_table(&self, confidence_level: f64) -> StatsResult<Vec<CoefficientRow>> {
        let df = self.df_residual as f64;
        let crit = t_critical(df, confidence_level)?;

        self.info
            .column_names
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let estimate = self.coefficients[j];
                let std_error = self.covariance[(j, j)].sqrt();
                let t_value = estimate / std_error;
                let p_value = if t_value.is_nan() {
                    f64::NAN
                } else {
                    t_two_sided_p(t_value, df)?
                };
                Ok(CoefficientRow {
                    name: name.clone(),
                    estimate,
                    std_error,
                    t_value,
                    p_value,
                    ci_lower: estimate - crit * std_error,
                    ci_upper: estimate + crit * std_error,
                })
            })
            .collect()
    }

    /// Predicted response for the rows of `table`
    pub fn predict(&self, table: &Table) -> StatsResult<Vec<f64>> {
        let x = self.info.encode(table)?;
        let predictions = (0..x.nrows())
            .map(|i| {
                (0..x.ncols())
                    .map(|j| x[(i, j)] * self.coefficients[j])
                    .sum()
            })
            .collect();
        debug!(rows = x.nrows(), "predictions computed");
        Ok(predictions)
    }
}
