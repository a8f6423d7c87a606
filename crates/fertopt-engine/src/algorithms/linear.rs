use fertopt_lp::{ConstraintOp, LinearProgram, SolutionStatus, Solver};
use rand::RngCore;
use tracing::debug;

use super::{Algorithm, AlgorithmKind, SolverFailure, SolverOutcome};
use crate::model::ConvergenceInfo;
use crate::problem::OptimizationProblem;
use crate::settings::LinearProgrammingSettings;

/// Continuous relaxation `min c.x` over the constraint rows with `0 <= x <= 1`.
/// The optimum of the relaxation, not a guaranteed integer optimum; methods
/// with weight above 0.5 count as selected.
pub struct LinearRelaxation {
    solver: Solver,
}

impl LinearRelaxation {
    pub fn new(settings: &LinearProgrammingSettings) -> Self {
        Self {
            solver: Solver::new()
                .with_max_iterations(settings.max_iterations)
                .with_tolerance(settings.tolerance),
        }
    }

    fn program(problem: &OptimizationProblem) -> LinearProgram {
        let variables = problem.methods.iter().map(|m| m.method_id.clone()).collect();
        let mut lp = LinearProgram::new(variables);
        lp.set_objective(problem.objective_coefficients.clone(), true);

        let system = &problem.constraints;
        for row in 0..system.len() {
            let (lower, upper) = system.bounds[row];
            lp.add_range(system.labels[row].clone(), system.matrix[row].clone(), lower, upper);
        }

        let n = problem.num_methods();
        for (j, &(lower, upper)) in problem.variable_bounds.iter().enumerate() {
            if lower > 0.0 {
                let mut unit = vec![0.0; n];
                unit[j] = 1.0;
                lp.add_constraint(format!("{} lower bound", problem.methods[j].method_id), unit, ConstraintOp::Ge, lower);
            }
            lp.set_upper_bound(j, upper);
        }
        lp
    }
}

impl Algorithm for LinearRelaxation {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::LinearProgramming
    }

    fn solve(&self, problem: &OptimizationProblem, _rng: &mut dyn RngCore) -> Result<SolverOutcome, SolverFailure> {
        let lp = Self::program(problem);
        let solution = self.solver.solve(&lp)?;
        debug!(status = ?solution.status, pivots = solution.iterations, "linear relaxation solved");

        match solution.status {
            SolutionStatus::Optimal => Ok(SolverOutcome {
                objective_value: solution.objective_value,
                constraint_violations: Vec::new(),
                convergence: ConvergenceInfo {
                    success: true,
                    feasible: true,
                    iterations: solution.iterations,
                    evaluations: solution.iterations,
                    message: "optimal solution of the continuous relaxation".to_string(),
                    final_temperature: None,
                },
                weights: solution.values,
            }),
            SolutionStatus::Infeasible => Err(SolverFailure::Infeasible {
                violations: solution.violations.into_iter().map(|v| v.description).collect(),
            }),
            SolutionStatus::Unbounded => Err(SolverFailure::Unbounded),
            SolutionStatus::IterationLimit => Err(SolverFailure::NotConverged(solution.iterations)),
        }
    }
}
