use crate::error::OptimizerError;
use crate::model::{ConstraintKind, ConstraintOperator, MethodCostEstimate, OptimizationConstraint};
use crate::scenario::{MAX_COST_PER_ACRE, ScenarioParameters, ScenarioType, WEATHER_TOLERANCE};

/// Linear rows over the selection vector with `lower <= a.x <= upper` bounds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSystem {
    pub matrix: Vec<Vec<f64>>,
    pub bounds: Vec<(f64, f64)>,
    pub labels: Vec<String>,
}

impl ConstraintSystem {
    pub fn len(&self) -> usize {
        self.matrix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    fn push(&mut self, label: impl Into<String>, row: Vec<f64>, lower: f64, upper: f64) {
        self.matrix.push(row);
        self.bounds.push((lower, upper));
        self.labels.push(label.into());
    }

    /// Rows whose coefficients are all one, i.e. bounds on the selection count
    pub fn is_cardinality_row(&self, row: usize) -> bool {
        self.matrix[row].iter().all(|&a| a == 1.0)
    }
}

fn operator_bounds(operator: ConstraintOperator, value: f64) -> (f64, f64) {
    match operator {
        ConstraintOperator::Le => (f64::NEG_INFINITY, value),
        ConstraintOperator::Ge => (value, f64::INFINITY),
        ConstraintOperator::Eq => (value, value),
    }
}

/// Assemble the default selection-count rows, caller constraints and rows
/// derived from cost and weather scenarios.
pub fn build_constraints(
    estimates: &[MethodCostEstimate],
    constraints: &[OptimizationConstraint],
    scenarios: &[ScenarioParameters],
) -> Result<ConstraintSystem, OptimizerError> {
    let n = estimates.len();
    let mut system = ConstraintSystem::default();

    system.push("at least one method selected", vec![1.0; n], 1.0, f64::INFINITY);
    system.push(format!("at most {n} methods selected"), vec![1.0; n], f64::NEG_INFINITY, n as f64);

    for constraint in constraints {
        if !constraint.value.is_finite() {
            return Err(OptimizerError::InvalidConstraint(format!(
                "{} has non-finite value",
                constraint.variable
            )));
        }
        match constraint.constraint_type {
            ConstraintKind::Selection => {
                let (lower, upper) = operator_bounds(constraint.operator, constraint.value);
                let label = if constraint.description.is_empty() {
                    format!("{} {} {}", constraint.variable, constraint.operator.symbol(), constraint.value)
                } else {
                    constraint.description.clone()
                };
                system.push(label, vec![1.0; n], lower, upper);
            }
        }
    }

    for scenario in scenarios {
        match scenario.scenario_type {
            ScenarioType::Cost => {
                if let Some(max_cost) = scenario.get(MAX_COST_PER_ACRE) {
                    let row = estimates.iter().map(|e| e.total_cost_per_acre).collect();
                    system.push(
                        format!("{}: total cost <= {max_cost:.2}", scenario.label()),
                        row,
                        f64::NEG_INFINITY,
                        max_cost,
                    );
                }
            }
            ScenarioType::Weather => {
                if let Some(tolerance) = scenario.get(WEATHER_TOLERANCE) {
                    system.push(
                        format!("{}: weather tolerance >= {tolerance:.2}", scenario.label()),
                        vec![tolerance; n],
                        tolerance,
                        f64::INFINITY,
                    );
                }
            }
            _ => {}
        }
    }

    Ok(system)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimates(costs: &[f64]) -> Vec<MethodCostEstimate> {
        costs
            .iter()
            .enumerate()
            .map(|(i, &c)| MethodCostEstimate {
                method_id: format!("m{i}"),
                total_cost_per_acre: c,
                estimated_revenue_per_acre: 0.0,
                efficiency_score: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_default_rows() {
        let system = build_constraints(&estimates(&[1.0, 2.0, 3.0]), &[], &[]).unwrap();
        assert_eq!(system.len(), 2);
        assert_eq!(system.bounds[0], (1.0, f64::INFINITY));
        assert_eq!(system.bounds[1], (f64::NEG_INFINITY, 3.0));
        assert!(system.is_cardinality_row(0) && system.is_cardinality_row(1));
    }

    #[test]
    fn test_caller_rows() {
        let constraints = vec![
            OptimizationConstraint::selection(ConstraintOperator::Le, 1.0),
            OptimizationConstraint::selection(ConstraintOperator::Eq, 2.0),
        ];
        let system = build_constraints(&estimates(&[1.0, 2.0]), &constraints, &[]).unwrap();
        assert_eq!(system.len(), 4);
        assert_eq!(system.bounds[2], (f64::NEG_INFINITY, 1.0));
        assert_eq!(system.bounds[3], (2.0, 2.0));
    }

    #[test]
    fn test_scenario_rows() {
        let scenarios = vec![
            ScenarioParameters::new(ScenarioType::Cost, 0.5, "budget").with_parameter(MAX_COST_PER_ACRE, 60.0),
            ScenarioParameters::new(ScenarioType::Weather, 0.5, "storm").with_parameter(WEATHER_TOLERANCE, 0.4),
            ScenarioParameters::new(ScenarioType::Cost, 0.0, "no cap"),
        ];
        let system = build_constraints(&estimates(&[25.0, 50.0]), &[], &scenarios).unwrap();

        assert_eq!(system.len(), 4);
        assert_eq!(system.matrix[2], vec![25.0, 50.0]);
        assert_eq!(system.bounds[2], (f64::NEG_INFINITY, 60.0));
        assert_eq!(system.matrix[3], vec![0.4, 0.4]);
        assert_eq!(system.bounds[3], (0.4, f64::INFINITY));
        assert!(!system.is_cardinality_row(2));
    }
}
