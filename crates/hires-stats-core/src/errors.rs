use thiserror::Error;

/// Errors that can occur during statistical computations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    // Input validation errors
    #[error("Schema error on column '{column}': {reason}")]
    Schema { column: String, reason: String },

    #[error("Invalid level '{value}' in column '{column}': not in the declared ordering")]
    InvalidLevel { column: String, value: String },

    #[error("Insufficient data for {context}: need at least {needed}, found {found}")]
    InsufficientData {
        context: String,
        needed: usize,
        found: usize,
    },

    #[error("Dimension mismatch: expected {expected} elements, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Empty input: {field} cannot be empty")]
    EmptyInput { field: &'static str },

    #[error("Column '{column}' has zero variance")]
    ZeroVariance { column: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Model errors
    #[error(
        "Design matrix is rank deficient: column '{column}' is linearly dependent \
         (rank {rank} of {columns} columns); simplify the term specification"
    )]
    RankDeficiency {
        column: String,
        rank: usize,
        columns: usize,
    },

    #[error("Models are not nested: {0}")]
    NestedModel(String),

    // Internal errors
    #[error("Distribution error: {0}")]
    Distribution(String),
}

impl StatsError {
    pub(crate) fn schema(column: &str, reason: impl Into<String>) -> Self {
        StatsError::Schema {
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn insufficient(context: impl Into<String>, needed: usize, found: usize) -> Self {
        StatsError::InsufficientData {
            context: context.into(),
            needed,
            found,
        }
    }
}

/// Result type for statistical operations
pub type StatsResult<T> = Result<T, StatsError>;
