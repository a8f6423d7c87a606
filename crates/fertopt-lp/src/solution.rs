/// The result of solving a linear program
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolutionStatus,
    /// Values for each structural variable
    pub values: Vec<f64>,
    pub objective_value: f64,
    /// Pivots performed across both phases
    pub iterations: usize,
    /// Constraint violations (populated when infeasible)
    pub violations: Vec<ConstraintViolation>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal vertex was found
    Optimal,
    /// No point satisfies every constraint
    Infeasible,
    /// The objective can be improved without limit
    Unbounded,
    /// The pivot budget ran out before optimality was proven
    IterationLimit,
}

/// Information about a violated constraint
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    pub constraint: String,
    /// Required value (from constraint RHS)
    pub required: f64,
    /// Value achieved by the best-effort point
    pub actual: f64,
    pub violation_amount: f64,
    pub description: String,
}

impl Solution {
    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    pub fn infeasible(violations: Vec<ConstraintViolation>, iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            values: Vec::new(),
            objective_value: f64::INFINITY,
            iterations,
            violations,
        }
    }

    pub fn unbounded(iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Unbounded,
            values: Vec::new(),
            objective_value: f64::NEG_INFINITY,
            iterations,
            violations: Vec::new(),
        }
    }
}
