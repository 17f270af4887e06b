//! Composed hire/policy analysis
//!
//! Runs every stage over one validated table. Table preparation (schema
//! check, outlier filter, orderings, period flag) is fatal; after that each
//! artifact carries its own `StatsResult`, so a failed fit leaves the
//! summaries, the Welch test and the correlation matrix intact.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::data::{
    apply_orders, filter_outliers_with_bounds, group_mean, CategoricalSpec, GroupBounds,
    GroupSummary, Table, DATE, DAY, HIRES, MONTH, YEAR,
};
use crate::diagnostics::model_aic_bic;
use crate::models::{compare_models, fit_ols, marginal_means, EmmTable, FittedModel, ModelSpec};
use crate::tests::{
    correlation_matrix, welch_t_test, CorrelationMatrix, PearsonOptions, WelchOptions, WelchResult,
};
use crate::types::{
    Adjustment, CompareOptions, ContrastRow, EmmOptions, FTestResult, FitOptions, OutlierOptions,
};
use crate::StatsResult;

/// Name of the derived pre/post cut-over column
pub const PERIOD: &str = "period";

/// Configuration of the full analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 0/1 policy indicator columns
    pub policies: Vec<String>,
    /// First day of the COVID period
    pub covid_start: NaiveDate,
    /// Labels for rows before and from `covid_start`
    pub period_labels: [String; 2],
    pub outlier: OutlierOptions,
    pub confidence_level: f64,
    pub significance_level: f64,
    pub adjustment: Adjustment,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            policies: [
                "schools_closed",
                "pubs_closed",
                "shops_closed",
                "eating_places_closed",
                "stay_at_home",
                "household_mixing_indoors_banned",
                "wfh",
                "rule_of_6_indoors",
                "curfew",
                "eat_out_to_help_out",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            covid_start: NaiveDate::from_ymd_opt(2020, 3, 23).unwrap_or(NaiveDate::MIN),
            period_labels: ["Pre-COVID".to_string(), "COVID".to_string()],
            outlier: OutlierOptions::default(),
            confidence_level: 0.95,
            significance_level: 0.05,
            adjustment: Adjustment::None,
        }
    }
}

/// Every artifact of one analysis run
#[derive(Debug)]
pub struct AnalysisReport {
    /// Per-year Hires bounds used by the outlier filter
    pub bounds: Vec<GroupBounds>,
    pub rows_before: usize,
    pub rows_after: usize,
    /// Mean Hires by year and month
    pub monthly_means: StatsResult<GroupSummary>,
    /// Mean Hires by period and weekday
    pub weekday_means: StatsResult<GroupSummary>,
    /// `Hires ~ month + policies` on the COVID period
    pub policy_model: StatsResult<FittedModel>,
    /// Policies against `Hires ~ month` on the COVID period
    pub policy_test: StatsResult<FTestResult>,
    /// `year + month` against `year * month`
    pub calendar_test: StatsResult<FTestResult>,
    /// (AIC, BIC) of the additive and crossed calendar models
    pub calendar_criteria: StatsResult<[(f64, f64); 2]>,
    /// Marginal means by year from the crossed calendar model
    pub year_means: StatsResult<EmmTable>,
    pub year_contrasts: StatsResult<Vec<ContrastRow>>,
    /// Pre-COVID against COVID Hires
    pub period_test: StatsResult<WelchResult>,
    /// Hires and the policy flags within the COVID period
    pub policy_correlations: StatsResult<CorrelationMatrix>,
}

fn both<'a, A, B>(a: &'a StatsResult<A>, b: &'a StatsResult<B>) -> StatsResult<(&'a A, &'a B)> {
    match (a, b) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(e), _) | (_, Err(e)) => Err(e.clone()),
    }
}

/// Filter, order and flag the raw table
fn prepare(table: &Table, config: &AnalysisConfig) -> StatsResult<(Vec<GroupBounds>, Table)> {
    table.require_hire_schema(&config.policies)?;

    let (filtered, bounds) = filter_outliers_with_bounds(table, YEAR, HIRES, &config.outlier)?;

    let orders = [
        CategoricalSpec::weekdays(DAY),
        CategoricalSpec::months(MONTH),
        CategoricalSpec::natural(&filtered, YEAR)?,
    ];
    let ordered = apply_orders(&filtered, &orders)?;
    let [before, after] = &config.period_labels;
    let flagged = ordered.with_period_flag(
        PERIOD,
        DATE,
        config.covid_start,
        [before.as_str(), after.as_str()],
    )?;
    Ok((bounds, flagged))
}

/// Run the full analysis over `table`.
///
/// # Errors
/// Only table preparation errors are returned here; see [`AnalysisReport`].
pub fn analyse(table: &Table, config: &AnalysisConfig) -> StatsResult<AnalysisReport> {
    let (bounds, data) = prepare(table, config)?;
    let fit_options = FitOptions::default();
    let compare_options = CompareOptions {
        significance_level: config.significance_level,
    };
    let policies: Vec<&str> = config.policies.iter().map(String::as_str).collect();

    let monthly_means = group_mean(&data, &[YEAR, MONTH], HIRES);
    let weekday_means = group_mean(&data, &[PERIOD, DAY], HIRES);

    let period_codes = data.factor(PERIOD)?.codes().to_vec();
    let covid = data
        .filter_rows(|i| period_codes[i] == 1)
        .drop_unused_levels(MONTH);

    let (policy_model, policy_test) = match &covid {
        Ok(covid) => {
            let month_only =
                fit_ols(covid, &ModelSpec::main_effects(HIRES, &[MONTH]), &fit_options);
            let mut columns = vec![MONTH];
            columns.extend(&policies);
            let with_policies =
                fit_ols(covid, &ModelSpec::main_effects(HIRES, &columns), &fit_options);
            let test = both(&month_only, &with_policies)
                .and_then(|(r, f)| compare_models(r, f, &compare_options));
            (with_policies, test)
        }
        Err(e) => (Err(e.clone()), Err(e.clone())),
    };

    let additive = fit_ols(&data, &ModelSpec::main_effects(HIRES, &[YEAR, MONTH]), &fit_options);
    let crossed = fit_ols(&data, &ModelSpec::crossed(HIRES, &[YEAR, MONTH]), &fit_options);
    let calendar_test =
        both(&additive, &crossed).and_then(|(r, f)| compare_models(r, f, &compare_options));
    let calendar_criteria = both(&additive, &crossed)
        .and_then(|(r, f)| Ok([model_aic_bic(r)?, model_aic_bic(f)?]));

    let emm_options = EmmOptions {
        confidence_level: config.confidence_level,
    };
    let year_means = crossed
        .as_ref()
        .map_err(|e| e.clone())
        .and_then(|m| marginal_means(m, YEAR, &emm_options));
    let year_contrasts = year_means
        .as_ref()
        .map_err(|e| e.clone())
        .and_then(|t| t.contrasts(config.adjustment));

    let hires = data.numeric(HIRES)?;
    let (mut pre, mut post) = (Vec::new(), Vec::new());
    for (&code, &h) in period_codes.iter().zip(hires.iter()) {
        if code == 0 {
            pre.push(h);
        } else {
            post.push(h);
        }
    }
    let period_test = welch_t_test(
        &pre,
        &post,
        &WelchOptions {
            confidence_level: config.confidence_level,
        },
    );

    let mut correlated = vec![HIRES];
    correlated.extend(&policies);
    let policy_correlations = covid
        .as_ref()
        .map_err(|e| e.clone())
        .and_then(|t| {
            correlation_matrix(
                t,
                &correlated,
                &PearsonOptions {
                    confidence_level: config.confidence_level,
                },
            )
        });

    let failed = [
        monthly_means.is_err(),
        weekday_means.is_err(),
        policy_test.is_err(),
        calendar_test.is_err(),
        year_contrasts.is_err(),
        period_test.is_err(),
        policy_correlations.is_err(),
    ]
    .iter()
    .filter(|f| **f)
    .count();
    if failed > 0 {
        warn!(failed, "some analysis artifacts could not be produced");
    }
    info!(
        rows_before = table.n_rows(),
        rows_after = data.n_rows(),
        "analysis complete"
    );

    Ok(AnalysisReport {
        bounds,
        rows_before: table.n_rows(),
        rows_after: data.n_rows(),
        monthly_means,
        weekday_means,
        policy_model,
        policy_test,
        calendar_test,
        calendar_criteria,
        year_means,
        year_contrasts,
        period_test,
        policy_correlations,
    })
}
