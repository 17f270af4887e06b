//! Diagnostic functions for regression models

mod information_criteria;

pub use information_criteria::{compute_aic, compute_bic, log_likelihood, model_aic_bic};
