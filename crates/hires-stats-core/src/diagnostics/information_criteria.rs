//! Information criteria for model selection (AIC, BIC)
//!
//! Gaussian log-likelihood at the maximum-likelihood variance RSS/n, with
//! the variance counted as a parameter, so values are comparable with R's
//! `AIC(lm(...))`.

use crate::errors::{StatsError, StatsResult};
use crate::models::FittedModel;

/// Gaussian log-likelihood from RSS
///
/// logL = -n/2 · (ln(2π) + ln(RSS/n) + 1)
pub fn log_likelihood(rss: f64, n: usize) -> StatsResult<f64> {
    if n == 0 {
        return Err(StatsError::InvalidInput("n must be > 0".into()));
    }
    if rss < 0.0 {
        return Err(StatsError::InvalidInput("RSS must be non-negative".into()));
    }
    let n_f = n as f64;

    // Handle edge case where RSS = 0 (perfect fit)
    if rss == 0.0 {
        return Ok(f64::INFINITY);
    }

    Ok(-0.5 * n_f * ((2.0 * std::f64::consts::PI).ln() + (rss / n_f).ln() + 1.0))
}

/// AIC = -2·logL + 2k, k = coefficients + 1 (variance)
pub fn compute_aic(rss: f64, n: usize, n_coefficients: usize) -> StatsResult<f64> {
    let k = (n_coefficients + 1) as f64;
    Ok(-2.0 * log_likelihood(rss, n)? + 2.0 * k)
}

/// BIC = -2·logL + k·ln(n)
///
/// BIC penalizes model complexity more heavily than AIC for larger samples.
pub fn compute_bic(rss: f64, n: usize, n_coefficients: usize) -> StatsResult<f64> {
    let k = (n_coefficients + 1) as f64;
    Ok(-2.0 * log_likelihood(rss, n)? + k * (n as f64).ln())
}

/// AIC and BIC of a fitted model
pub fn model_aic_bic(model: &FittedModel) -> StatsResult<(f64, f64)> {
    let n = model.n_observations();
    let k = model.rank();
    Ok((
        compute_aic(model.rss(), n, k)?,
        compute_bic(model.rss(), n, k)?,
    ))
}
