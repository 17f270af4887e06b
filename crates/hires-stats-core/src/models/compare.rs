//! Nested model comparison (F-test on residual sums of squares)

use tracing::info;

use super::ols::FittedModel;
use crate::errors::{StatsError, StatsResult};
use crate::inference::f_upper_p;
use crate::types::{CompareOptions, FTestResult};

/// Test whether the extra terms of `full` explain significantly more
/// variance than `restricted`.
///
/// Both models must share the response and row set, and `full` must contain
/// every term of `restricted` plus at least one more parameter.
pub fn compare_models(
    restricted: &FittedModel,
    full: &FittedModel,
    options: &CompareOptions,
) -> StatsResult<FTestResult> {
    if restricted.spec().response != full.spec().response {
        return Err(StatsError::NestedModel(format!(
            "responses differ ('{}' vs '{}')",
            restricted.spec().response,
            full.spec().response
        )));
    }
    if restricted.response() != full.response() {
        return Err(StatsError::NestedModel(
            "models were fit on different rows".into(),
        ));
    }
    if !full.spec().contains(restricted.spec()) {
        return Err(StatsError::NestedModel(
            "full model does not contain every restricted term".into(),
        ));
    }

    let df_r = restricted.df_residual();
    let df2 = full.df_residual();
    if df_r <= df2 {
        return Err(StatsError::NestedModel(format!(
            "full model has no additional parameters (residual df {df_r} vs {df2})"
        )));
    }
    let df1 = df_r - df2;

    let rss_r = restricted.rss();
    let rss_f = full.rss();
    let reduction = (rss_r - rss_f).max(0.0);

    let f_statistic = if rss_f > 0.0 {
        (reduction / df1 as f64) / (rss_f / df2 as f64)
    } else if reduction > 0.0 {
        f64::INFINITY
    } else {
        return Err(StatsError::InvalidInput(
            "both models fit exactly; the F statistic is undefined".into(),
        ));
    };
    let p_value = f_upper_p(f_statistic, df1 as f64, df2 as f64)?;

    info!(
        f_statistic,
        df1,
        df2,
        p_value,
        "nested model comparison"
    );

    Ok(FTestResult {
        f_statistic,
        df1,
        df2,
        p_value,
        rss_restricted: rss_r,
        rss_full: rss_f,
        significant: p_value < options.significance_level,
        significance_level: options.significance_level,
    })
}

/// Compare each consecutive pair in a sequence of nested models
pub fn compare_sequence(
    models: &[&FittedModel],
    options: &CompareOptions,
) -> StatsResult<Vec<FTestResult>> {
    if models.len() < 2 {
        return Err(StatsError::insufficient(
            "model sequence comparison",
            2,
            models.len(),
        ));
    }
    models
        .windows(2)
        .map(|pair| compare_models(pair[0], pair[1], options))
        .collect()
}
