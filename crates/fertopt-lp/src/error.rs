use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LpError {
    #[error("{what} has {found} coefficients, expected {expected}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },
    #[error("Non-finite value in {0}")]
    NonFinite(String),
    #[error("Invalid upper bound {bound} for variable {variable}")]
    InvalidBound { variable: String, bound: f64 },
}
