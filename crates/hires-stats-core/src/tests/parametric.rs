//! Parametric statistical tests
//!
//! - Welch two-sample t-test (unequal variances)

use anofox_tests::{t_test as lib_t_test, Alternative, TTestKind};
use tracing::debug;

use super::{check_finite, convert_error, is_constant, WelchResult};
use crate::inference::check_level;
use crate::{StatsError, StatsResult};

/// Options for the Welch t-test
#[derive(Debug, Clone)]
pub struct WelchOptions {
    /// Confidence level for the mean-difference interval (default: 0.95)
    pub confidence_level: f64,
}

impl Default for WelchOptions {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
        }
    }
}

fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Welch two-sample t-test
///
/// Compares the means of two independent samples without assuming equal
/// variances; degrees of freedom follow the Welch–Satterthwaite
/// approximation.
///
/// # Arguments
/// * `group1` - First sample data
/// * `group2` - Second sample data
/// * `options` - Test options
pub fn welch_t_test(
    group1: &[f64],
    group2: &[f64],
    options: &WelchOptions,
) -> StatsResult<WelchResult> {
    if group1.len() < 2 {
        return Err(StatsError::insufficient(
            "Welch t-test group 1",
            2,
            group1.len(),
        ));
    }
    if group2.len() < 2 {
        return Err(StatsError::insufficient(
            "Welch t-test group 2",
            2,
            group2.len(),
        ));
    }
    check_finite(group1, "group 1")?;
    check_finite(group2, "group 2")?;
    check_level(options.confidence_level)?;
    if is_constant(group1) && is_constant(group2) {
        return Err(StatsError::ZeroVariance {
            column: "both samples".into(),
        });
    }

    let result = lib_t_test(
        group1,
        group2,
        TTestKind::Welch,
        Alternative::TwoSided,
        0.0,
        Some(options.confidence_level),
    )
    .map_err(convert_error)?;

    debug!(
        t_statistic = result.statistic,
        df = result.df,
        p_value = result.p_value,
        "Welch t-test"
    );

    Ok(WelchResult {
        t_statistic: result.statistic,
        df: result.df,
        p_value: result.p_value,
        mean_diff: mean(group1) - mean(group2),
        ci_lower: result.conf_int.as_ref().map(|ci| ci.lower).unwrap_or(f64::NAN),
        ci_upper: result.conf_int.as_ref().map(|ci| ci.upper).unwrap_or(f64::NAN),
        confidence_level: options.confidence_level,
        n1: group1.len(),
        n2: group2.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_welch_scenario() {
        let a = [10.0, 12.0, 11.0, 13.0];
        let b = [20.0, 22.0, 19.0, 21.0];
        let r = welch_t_test(&a, &b, &WelchOptions::default()).unwrap();

        assert!((r.mean_diff + 9.0).abs() < 1e-12);
        // equal variances (5/3) and sizes: df = 2(n-1) = 6
        assert!((r.df - 6.0).abs() < 1e-9);
        assert!((r.t_statistic + 9.0 / (5.0f64 / 6.0).sqrt()).abs() < 1e-9);
        assert!(r.p_value < 0.01);
        assert!(r.ci_lower < -9.0 && r.ci_upper > -9.0 && r.ci_upper < 0.0);
    }

    #[test]
    fn test_welch_unequal_variances() {
        let g1 = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let g2 = vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0];
        let r = welch_t_test(&g1, &g2, &WelchOptions::default()).unwrap();

        // v1 = 2.5, v2 = 18.6667
        let a = 2.5 / 5.0;
        let b = (56.0 / 3.0) / 7.0;
        let df = (a + b) * (a + b) / (a * a / 4.0 + b * b / 6.0);
        assert!((r.df - df).abs() < 1e-9);
        assert!(r.t_statistic < 0.0);
        assert!(r.df < 10.0);
    }

    #[test]
    fn test_welch_interval_widens_with_level() {
        let a = [10.0, 12.0, 11.0, 13.0];
        let b = [20.0, 22.0, 19.0, 21.0];
        let r95 = welch_t_test(&a, &b, &WelchOptions::default()).unwrap();
        let r99 = welch_t_test(&a, &b, &WelchOptions { confidence_level: 0.99 }).unwrap();
        assert_eq!(r99.confidence_level, 0.99);
        assert!(r99.ci_lower < r95.ci_lower && r99.ci_upper > r95.ci_upper);
        // interval is centred on the mean difference
        assert!(((r95.ci_lower + r95.ci_upper) / 2.0 + 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_welch_insufficient_data() {
        let result = welch_t_test(&[1.0], &[1.0, 2.0], &WelchOptions::default());
        assert!(matches!(result, Err(StatsError::InsufficientData { .. })));
        let result = welch_t_test(&[1.0, 2.0], &[], &WelchOptions::default());
        assert!(matches!(result, Err(StatsError::InsufficientData { .. })));
    }

    #[test]
    fn test_welch_constant_samples() {
        let result = welch_t_test(&[3.0, 3.0], &[3.0, 3.0, 3.0], &WelchOptions::default());
        assert!(matches!(result, Err(StatsError::ZeroVariance { .. })));
    }

    #[test]
    fn test_welch_non_finite() {
        let result = welch_t_test(&[1.0, f64::NAN], &[1.0, 2.0], &WelchOptions::default());
        assert!(matches!(result, Err(StatsError::InvalidInput(_))));
    }

    proptest! {
        #[test]
        fn welch_p_bounded_and_antisymmetric(
            a in proptest::collection::vec(-1e3_f64..1e3, 3..=20),
            b in proptest::collection::vec(-1e3_f64..1e3, 3..=20),
        ) {
            if let (Ok(ab), Ok(ba)) = (
                welch_t_test(&a, &b, &WelchOptions::default()),
                welch_t_test(&b, &a, &WelchOptions::default()),
            ) {
                prop_assert!(ab.p_value >= 0.0 && ab.p_value <= 1.0, "p = {}", ab.p_value);
                prop_assert!((ab.t_statistic + ba.t_statistic).abs() < 1e-9);
                prop_assert!((ab.p_value - ba.p_value).abs() < 1e-9);
            }
        }
    }
}
