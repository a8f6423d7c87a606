use rand::RngCore;

use super::{Algorithm, AlgorithmKind, SolverFailure, SolverOutcome};
use crate::model::ConvergenceInfo;
use crate::problem::OptimizationProblem;

/// Exact subset selection over selection counts.
///
/// `best[i][j]` is the smallest coefficient sum choosing exactly `j` of the
/// first `i` methods. Only the all-ones (cardinality) rows restrict `j`; other
/// rows, such as cost caps from scenarios, are not modeled. Any such row the
/// chosen subset breaks is reported in `constraint_violations` and the outcome
/// is marked infeasible.
pub struct CardinalityDynamicProgram;

impl Algorithm for CardinalityDynamicProgram {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::DynamicProgramming
    }

    fn solve(&self, problem: &OptimizationProblem, _rng: &mut dyn RngCore) -> Result<SolverOutcome, SolverFailure> {
        let (min_count, max_count) = problem.cardinality_bounds().ok_or(SolverFailure::NoAdmissibleCardinality)?;
        let costs = &problem.objective_coefficients;
        let n = costs.len();

        let mut best = vec![vec![f64::INFINITY; n + 1]; n + 1];
        let mut take = vec![vec![false; n + 1]; n + 1];
        best[0][0] = 0.0;
        for i in 1..=n {
            best[i][0] = 0.0;
            for j in 1..=i {
                let skip = best[i - 1][j];
                let with = best[i - 1][j - 1] + costs[i - 1];
                if with < skip {
                    best[i][j] = with;
                    take[i][j] = true;
                } else {
                    best[i][j] = skip;
                }
            }
        }

        let count = (min_count..=max_count.min(n))
            .filter(|&j| best[n][j].is_finite())
            .min_by(|&a, &b| best[n][a].total_cmp(&best[n][b]))
            .ok_or(SolverFailure::NoAdmissibleCardinality)?;

        let mut weights = vec![0.0; n];
        let mut j = count;
        for i in (1..=n).rev() {
            if j > 0 && take[i][j] {
                weights[i - 1] = 1.0;
                j -= 1;
            }
        }

        let constraint_violations = problem.violations(&weights);
        let feasible = constraint_violations.is_empty();
        let message = if feasible {
            format!("exact optimum selecting {count} of {n} methods")
        } else {
            format!(
                "cardinality optimum selecting {count} of {n} methods breaks {} non-cardinality rows",
                constraint_violations.len()
            )
        };

        Ok(SolverOutcome {
            objective_value: best[n][count],
            weights,
            constraint_violations,
            convergence: ConvergenceInfo {
                success: true,
                feasible,
                iterations: n,
                evaluations: n * (n + 1) / 2,
                message,
                final_temperature: None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::problem_with;
    use super::*;
    use crate::model::{ConstraintOperator, MethodCostEstimate, OptimizationConstraint, OptimizationObjective};
    use crate::scenario::{MAX_COST_PER_ACRE, ScenarioParameters, ScenarioType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn solve(problem: &OptimizationProblem) -> Result<SolverOutcome, SolverFailure> {
        CardinalityDynamicProgram.solve(problem, &mut ChaCha8Rng::seed_from_u64(0))
    }

    #[test]
    fn test_takes_all_negative_coefficients() {
        let problem = problem_with(
            &[(50.0, 150.0), (80.0, 100.0), (90.0, 60.0), (10.0, 40.0)],
            OptimizationObjective::MaximizeProfit,
            &[],
        );
        let outcome = solve(&problem).unwrap();

        assert_eq!(outcome.weights, vec![1.0, 1.0, 0.0, 1.0]);
        assert_eq!(outcome.objective_value, -150.0);
        assert!(outcome.convergence.feasible);
    }

    #[test]
    fn test_exact_count() {
        let constraints = [OptimizationConstraint::selection(ConstraintOperator::Eq, 2.0)];
        let problem = problem_with(
            &[(30.0, 0.0), (10.0, 0.0), (50.0, 0.0), (20.0, 0.0)],
            OptimizationObjective::MinimizeCost,
            &constraints,
        );
        let outcome = solve(&problem).unwrap();

        assert_eq!(outcome.weights, vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(outcome.objective_value, 30.0);
    }

    #[test]
    fn test_cost_rows_are_reported_not_enforced() {
        let mut problem = problem_with(&[(30.0, 0.0), (10.0, 0.0)], OptimizationObjective::MinimizeCost, &[]);
        let costs: Vec<MethodCostEstimate> = problem.method_costs.clone();
        let cap = ScenarioParameters::new(ScenarioType::Cost, 1.0, "tight budget").with_parameter(MAX_COST_PER_ACRE, 5.0);
        problem.constraints = crate::constraints::build_constraints(&costs, &[], &[cap]).unwrap();

        let outcome = solve(&problem).unwrap();

        assert_eq!(outcome.weights, vec![0.0, 1.0]);
        assert!(!outcome.convergence.feasible);
        assert_eq!(outcome.constraint_violations.len(), 1);
        assert!(outcome.constraint_violations[0].starts_with("tight budget"));
    }

    #[test]
    fn test_contradictory_counts_fail() {
        let constraints = [OptimizationConstraint::selection(ConstraintOperator::Ge, 5.0)];
        let problem = problem_with(&[(1.0, 0.0)], OptimizationObjective::MinimizeCost, &constraints);
        assert_eq!(solve(&problem).unwrap_err(), SolverFailure::NoAdmissibleCardinality);
    }
}
