use thiserror::Error;

/// Precondition failures surfaced to the caller. Solver failures never reach
/// this type; they become failed results instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("Unknown optimization objective: {0}")]
    UnknownObjective(String),
    #[error("Unknown optimization algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("Unknown scenario type: {0}")]
    UnknownScenarioType(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("No candidate application methods supplied")]
    EmptyMethodSet,
    #[error("{what}: expected {expected} entries, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Duplicate application method id: {0}")]
    DuplicateMethod(String),
    #[error("No cost estimate for application method {0}")]
    MissingCostEstimate(String),
    #[error("Cost estimate for unknown application method {0}")]
    UnknownCostEstimate(String),
    #[error("Invalid scenario '{scenario}': {reason}")]
    InvalidScenario { scenario: String, reason: String },
    #[error("Non-finite objective coefficient for method {0}")]
    NonFiniteCoefficient(String),
    #[error("Invalid constraint: {0}")]
    InvalidConstraint(String),
    #[error("Cost analysis failed: {0}")]
    CostAnalysis(String),
}

impl OptimizerError {
    /// Unknown selectors and bad settings, as opposed to bad input data
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            OptimizerError::UnknownObjective(_)
                | OptimizerError::UnknownAlgorithm(_)
                | OptimizerError::UnknownScenarioType(_)
                | OptimizerError::InvalidSettings(_)
        )
    }
}
