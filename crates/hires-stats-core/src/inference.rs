//! Reference distributions for p-values and critical values

use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

use crate::errors::{StatsError, StatsResult};

fn students_t(df: f64) -> StatsResult<StudentsT> {
    StudentsT::new(0.0, 1.0, df).map_err(|e| StatsError::Distribution(e.to_string()))
}

/// Reject confidence levels outside (0, 1)
pub fn check_level(confidence_level: f64) -> StatsResult<()> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(StatsError::InvalidInput(format!(
            "confidence level {confidence_level} must be in (0, 1)"
        )));
    }
    Ok(())
}

/// Two-sided p-value of a t statistic
pub fn t_two_sided_p(t: f64, df: f64) -> StatsResult<f64> {
    if t.is_infinite() {
        return Ok(0.0);
    }
    Ok((2.0 * students_t(df)?.sf(t.abs())).min(1.0))
}

/// Quantile `t(df, 1 - (1 - level)/2)` for a two-sided interval
pub fn t_critical(df: f64, confidence_level: f64) -> StatsResult<f64> {
    check_level(confidence_level)?;
    Ok(students_t(df)?.inverse_cdf(1.0 - (1.0 - confidence_level) / 2.0))
}

/// Right-tail probability of the F distribution
pub fn f_upper_p(f: f64, df1: f64, df2: f64) -> StatsResult<f64> {
    if f.is_infinite() {
        return Ok(0.0);
    }
    let dist = FisherSnedecor::new(df1, df2).map_err(|e| StatsError::Distribution(e.to_string()))?;
    Ok(dist.sf(f))
}
