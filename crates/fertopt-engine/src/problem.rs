use crate::constraints::{ConstraintSystem, build_constraints};
use crate::error::OptimizerError;
use crate::model::{ApplicationMethod, MethodCostEstimate, OptimizationConstraint, OptimizationObjective};
use crate::objective::build_objective;
use crate::scenario::ScenarioParameters;

/// Weight above which a method counts as selected
pub const SELECTION_THRESHOLD: f64 = 0.5;

const FEASIBILITY_TOLERANCE: f64 = 1e-9;

/// Everything a solver needs for one optimization call. Built fresh per call
/// and never shared between calls.
#[derive(Debug, Clone)]
pub struct OptimizationProblem {
    pub objective_coefficients: Vec<f64>,
    pub constraints: ConstraintSystem,
    /// Relaxed binary bounds, [0, 1] for every method
    pub variable_bounds: Vec<(f64, f64)>,
    pub method_costs: Vec<MethodCostEstimate>,
    pub methods: Vec<ApplicationMethod>,
    pub objective: OptimizationObjective,
    pub scenarios: Vec<ScenarioParameters>,
}

impl OptimizationProblem {
    /// `method_costs` must already be aligned with `methods`
    pub fn build(
        methods: Vec<ApplicationMethod>,
        method_costs: Vec<MethodCostEstimate>,
        objective: OptimizationObjective,
        constraints: &[OptimizationConstraint],
        scenarios: Vec<ScenarioParameters>,
    ) -> Result<Self, OptimizerError> {
        if methods.is_empty() {
            return Err(OptimizerError::EmptyMethodSet);
        }
        if method_costs.len() != methods.len() {
            return Err(OptimizerError::LengthMismatch {
                what: "method cost estimates",
                expected: methods.len(),
                found: method_costs.len(),
            });
        }

        let objective_coefficients = build_objective(&method_costs, objective, &scenarios)?;
        let constraints = build_constraints(&method_costs, constraints, &scenarios)?;

        Ok(Self {
            objective_coefficients,
            constraints,
            variable_bounds: vec![(0.0, 1.0); methods.len()],
            method_costs,
            methods,
            objective,
            scenarios,
        })
    }

    pub fn num_methods(&self) -> usize {
        self.methods.len()
    }

    /// Objective value of a (binary or relaxed) selection vector
    pub fn evaluate(&self, selection: &[f64]) -> f64 {
        self.objective_coefficients
            .iter()
            .zip(selection)
            .map(|(c, x)| c * x)
            .sum()
    }

    /// Objective value of a binary selection
    pub fn evaluate_binary(&self, selection: &[bool]) -> f64 {
        self.objective_coefficients
            .iter()
            .zip(selection)
            .filter(|(_, selected)| **selected)
            .map(|(c, _)| c)
            .sum()
    }

    fn row_activity(&self, row: usize, selection: &[f64]) -> f64 {
        self.constraints.matrix[row]
            .iter()
            .zip(selection)
            .map(|(a, x)| a * x)
            .sum()
    }

    fn row_shortfall(&self, row: usize, selection: &[f64]) -> f64 {
        let activity = self.row_activity(row, selection);
        let (lower, upper) = self.constraints.bounds[row];
        (lower - activity).max(activity - upper).max(0.0)
    }

    /// Sum of the amounts by which each row is violated
    pub fn total_violation(&self, selection: &[f64]) -> f64 {
        (0..self.constraints.len())
            .map(|row| self.row_shortfall(row, selection))
            .filter(|&v| v > FEASIBILITY_TOLERANCE)
            .sum()
    }

    pub fn total_violation_binary(&self, selection: &[bool]) -> f64 {
        self.total_violation(&to_weights(selection))
    }

    /// Human-readable description of every violated row
    pub fn violations(&self, selection: &[f64]) -> Vec<String> {
        (0..self.constraints.len())
            .filter_map(|row| {
                let shortfall = self.row_shortfall(row, selection);
                (shortfall > FEASIBILITY_TOLERANCE).then(|| {
                    format!(
                        "{} violated by {:.4} (value {:.4})",
                        self.constraints.labels[row],
                        shortfall,
                        self.row_activity(row, selection)
                    )
                })
            })
            .collect()
    }

    /// Admissible selection counts implied by the all-ones rows, or None when
    /// those rows contradict each other
    pub fn cardinality_bounds(&self) -> Option<(usize, usize)> {
        let n = self.num_methods() as f64;
        let mut lower: f64 = 0.0;
        let mut upper: f64 = n;
        for row in 0..self.constraints.len() {
            if self.constraints.is_cardinality_row(row) {
                let (lo, hi) = self.constraints.bounds[row];
                lower = lower.max((lo - FEASIBILITY_TOLERANCE).ceil());
                upper = upper.min((hi + FEASIBILITY_TOLERANCE).floor());
            }
        }
        (lower <= upper).then_some((lower as usize, upper as usize))
    }
}

pub fn to_weights(selection: &[bool]) -> Vec<f64> {
    selection.iter().map(|&s| if s { 1.0 } else { 0.0 }).collect()
}

pub fn is_selected(weight: f64) -> bool {
    weight > SELECTION_THRESHOLD
}
