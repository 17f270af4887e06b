//! Linear models: design matrices, OLS fitting, nested comparison and
//! marginal means

mod compare;
pub mod design;
mod emm;
mod ols;

pub use compare::{compare_models, compare_sequence};
pub use design::{build_design, Design, DesignInfo, Encoding, ModelSpec, Term, INTERCEPT};
pub use emm::{marginal_means, EmmTable};
pub use ols::{fit_ols, FittedModel};
