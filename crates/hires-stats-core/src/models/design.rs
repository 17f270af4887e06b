//! Model term specification and design-matrix construction
//!
//! A model is an explicit list of terms rather than a parsed formula. Each
//! variable is encoded once per row: a numeric column as itself, a factor as
//! one 0/1 dummy per non-reference level. A term's design columns are the
//! products of its constituents' encodings, with the first constituent
//! varying fastest (so `month:year` yields `month[Feb]:year[2020]`,
//! `month[Mar]:year[2020]`, ...).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use faer::Mat;
use tracing::debug;

use crate::data::table::{Column, Table};
use crate::errors::{StatsError, StatsResult};

pub const INTERCEPT: &str = "(Intercept)";

/// One model term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// A single column: numeric as-is, categorical dummy-encoded
    Main(String),
    /// Elementwise product of two or more columns' encodings
    Interaction(Vec<String>),
}

impl Term {
    pub fn main(column: &str) -> Self {
        Term::Main(column.to_string())
    }

    pub fn interaction(columns: &[&str]) -> Self {
        Term::Interaction(columns.iter().map(|c| c.to_string()).collect())
    }

    pub fn columns(&self) -> Vec<&str> {
        match self {
            Term::Main(c) => vec![c.as_str()],
            Term::Interaction(cs) => cs.iter().map(String::as_str).collect(),
        }
    }

    /// Order-free identity used for nesting checks: `a:b` equals `b:a`
    pub fn key(&self) -> BTreeSet<&str> {
        self.columns().into_iter().collect()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.columns().join(":"))
    }
}

/// Response plus ordered terms; an intercept is always included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub response: String,
    pub terms: Vec<Term>,
}

impl ModelSpec {
    pub fn new(response: &str, terms: Vec<Term>) -> Self {
        Self {
            response: response.to_string(),
            terms,
        }
    }

    /// `response ~ a + b + ...`
    pub fn main_effects(response: &str, columns: &[&str]) -> Self {
        Self::new(response, columns.iter().map(|c| Term::main(c)).collect())
    }

    /// `response ~ a * b * ...`: every main effect, then every two-way
    /// interaction, then every three-way, and so on.
    pub fn crossed(response: &str, columns: &[&str]) -> Self {
        let k = columns.len();
        let mut subsets: Vec<Vec<usize>> = (1u32..(1 << k))
            .map(|mask| (0..k).filter(|i| mask & (1 << i) != 0).collect())
            .collect();
        subsets.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        let terms = subsets
            .into_iter()
            .map(|s| match s.as_slice() {
                [i] => Term::main(columns[*i]),
                _ => Term::Interaction(s.iter().map(|&i| columns[i].to_string()).collect()),
            })
            .collect();
        Self::new(response, terms)
    }

    pub fn with_term(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    /// True when every term of `other` is also a term of `self`
    pub fn contains(&self, other: &ModelSpec) -> bool {
        let mine: Vec<BTreeSet<&str>> = self.terms.iter().map(Term::key).collect();
        other.terms.iter().all(|t| mine.contains(&t.key()))
    }

    /// Distinct predictor columns in first-use order
    pub fn variables(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for term in &self.terms {
            for c in term.columns() {
                if !seen.contains(&c) {
                    seen.push(c);
                }
            }
        }
        seen
    }

    fn validate(&self) -> StatsResult<()> {
        let mut keys = Vec::with_capacity(self.terms.len());
        for term in &self.terms {
            let key = term.key();
            if let Term::Interaction(cs) = term {
                if cs.len() < 2 || key.len() != cs.len() {
                    return Err(StatsError::InvalidInput(format!(
                        "interaction '{term}' needs two or more distinct columns"
                    )));
                }
            }
            if key.contains(self.response.as_str()) {
                return Err(StatsError::InvalidInput(format!(
                    "response '{}' cannot appear in term '{term}'",
                    self.response
                )));
            }
            if keys.contains(&key) {
                return Err(StatsError::InvalidInput(format!("duplicate term '{term}'")));
            }
            keys.push(key);
        }
        Ok(())
    }
}

/// How a predictor column is encoded
#[derive(Debug, Clone, PartialEq)]
pub enum Encoding {
    /// Used as-is; `mean` is its sample mean on the fitting data
    Numeric { mean: f64 },
    /// One dummy per level after the first (reference) level
    Factor { levels: Vec<String> },
}

impl Encoding {
    pub fn width(&self) -> usize {
        match self {
            Encoding::Numeric { .. } => 1,
            Encoding::Factor { levels } => levels.len() - 1,
        }
    }

    fn column_labels(&self, name: &str) -> Vec<String> {
        match self {
            Encoding::Numeric { .. } => vec![name.to_string()],
            Encoding::Factor { levels } => levels[1..]
                .iter()
                .map(|l| format!("{name}[{l}]"))
                .collect(),
        }
    }
}

/// Everything needed to rebuild design rows for a fitted model
#[derive(Debug, Clone, PartialEq)]
pub struct DesignInfo {
    pub spec: ModelSpec,
    pub encodings: BTreeMap<String, Encoding>,
    /// Design column names, intercept first
    pub column_names: Vec<String>,
}

impl DesignInfo {
    /// Derive encodings from the fitting table
    pub fn from_table(table: &Table, spec: &ModelSpec) -> StatsResult<Self> {
        spec.validate()?;
        table.numeric(&spec.response)?;

        let mut encodings = BTreeMap::new();
        for name in spec.variables() {
            let encoding = match table.column(name)? {
                Column::Numeric(_) | Column::Integer(_) => {
                    let values = table.numeric(name)?;
                    let mean = values.iter().sum::<f64>() / values.len().max(1) as f64;
                    Encoding::Numeric { mean }
                }
                other => {
                    let factor = other.to_factor(name)?;
                    if factor.levels().len() < 2 {
                        return Err(StatsError::schema(
                            name,
                            "factor needs at least two levels to be encoded",
                        ));
                    }
                    Encoding::Factor {
                        levels: factor.levels().to_vec(),
                    }
                }
            };
            encodings.insert(name.to_string(), encoding);
        }

        let mut column_names = vec![INTERCEPT.to_string()];
        for term in &spec.terms {
            let parts: Vec<Vec<String>> = term
                .columns()
                .iter()
                .map(|c| encodings[*c].column_labels(c))
                .collect();
            column_names.extend(cartesian(&parts, |labels: &[&String]| {
                labels.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(":")
            }));
        }

        Ok(Self {
            spec: spec.clone(),
            encodings,
            column_names,
        })
    }

    pub fn n_columns(&self) -> usize {
        self.column_names.len()
    }

    /// Expand per-variable encoded values into a full design row.
    ///
    /// `encoded(name)` must return `encodings[name].width()` values.
    pub fn expand_row(&self, mut encoded: impl FnMut(&str) -> Vec<f64>) -> Vec<f64> {
        let values: BTreeMap<&str, Vec<f64>> = self
            .encodings
            .keys()
            .map(|name| (name.as_str(), encoded(name.as_str())))
            .collect();

        let mut row = Vec::with_capacity(self.n_columns());
        row.push(1.0);
        for term in &self.spec.terms {
            let parts: Vec<Vec<f64>> = term.columns().iter().map(|c| values[c].clone()).collect();
            row.extend(cartesian(&parts, |xs: &[&f64]| xs.iter().copied().product::<f64>()));
        }
        row
    }

    /// Build the design matrix for `table` using these encodings.
    ///
    /// Factor labels must belong to the encoded levels.
    pub fn encode(&self, table: &Table) -> StatsResult<Mat<f64>> {
        let n = table.n_rows();
        let mut per_variable: BTreeMap<&str, Vec<Vec<f64>>> = BTreeMap::new();

        for (name, encoding) in &self.encodings {
            let rows = match encoding {
                Encoding::Numeric { .. } => {
                    table.numeric(name)?.into_iter().map(|x| vec![x]).collect()
                }
                Encoding::Factor { levels } => {
                    let labels = table.column(name)?.labels();
                    let mut rows = Vec::with_capacity(n);
                    for label in labels {
                        let idx = levels.iter().position(|l| *l == label).ok_or_else(|| {
                            StatsError::InvalidLevel {
                                column: name.clone(),
                                value: label.clone(),
                            }
                        })?;
                        rows.push(dummies(levels.len(), idx));
                    }
                    rows
                }
            };
            per_variable.insert(name.as_str(), rows);
        }

        let mut x = Mat::<f64>::zeros(n, self.n_columns());
        for i in 0..n {
            let row = self.expand_row(|name| per_variable[name][i].clone());
            for (j, v) in row.into_iter().enumerate() {
                x[(i, j)] = v;
            }
        }
        Ok(x)
    }
}

/// Dummy values for level `idx` of a factor with `n_levels` levels
pub(crate) fn dummies(n_levels: usize, idx: usize) -> Vec<f64> {
    (1..n_levels).map(|l| if l == idx { 1.0 } else { 0.0 }).collect()
}

/// Cartesian product over `parts`, first part varying fastest
fn cartesian<T, R>(parts: &[Vec<T>], combine: impl Fn(&[&T]) -> R) -> Vec<R> {
    let total: usize = parts.iter().map(Vec::len).product();
    let mut out = Vec::with_capacity(total);
    let mut picked: Vec<&T> = Vec::with_capacity(parts.len());
    for mut flat in 0..total {
        picked.clear();
        for part in parts {
            picked.push(&part[flat % part.len()]);
            flat /= part.len();
        }
        out.push(combine(&picked));
    }
    out
}

/// Design matrix, response vector and encodings for one fit
#[derive(Debug, Clone)]
pub struct Design {
    pub x: Mat<f64>,
    pub y: Vec<f64>,
    pub info: DesignInfo,
}

/// Build the design matrix and response for `spec` over `table`.
pub fn build_design(table: &Table, spec: &ModelSpec) -> StatsResult<Design> {
    let info = DesignInfo::from_table(table, spec)?;
    let x = info.encode(table)?;
    let y = table.numeric(&spec.response)?;
    debug!(
        rows = x.nrows(),
        columns = x.ncols(),
        terms = spec.terms.len(),
        "design matrix built"
    );
    Ok(Design { x, y, info })
}
