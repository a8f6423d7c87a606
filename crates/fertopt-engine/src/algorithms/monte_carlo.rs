use rand::{Rng, RngCore};
use tracing::debug;

use super::{Algorithm, AlgorithmKind, Candidate, SolverFailure, SolverOutcome, heuristic_outcome, track_best};
use crate::problem::OptimizationProblem;
use crate::settings::MonteCarloSettings;

/// Uniform random binary draws; keeps the best draw selecting between one and
/// all methods. Draws are independent, so there is no search pressure to
/// penalize: candidates are ranked feasibility first, then by objective.
/// No optimality guarantee.
pub struct MonteCarloSearch {
    settings: MonteCarloSettings,
}

impl MonteCarloSearch {
    pub fn new(settings: MonteCarloSettings) -> Self {
        Self { settings }
    }
}

impl Algorithm for MonteCarloSearch {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::StochasticOptimization
    }

    fn solve(&self, problem: &OptimizationProblem, rng: &mut dyn RngCore) -> Result<SolverOutcome, SolverFailure> {
        let n = problem.num_methods();
        let mut best: Option<Candidate> = None;
        let mut evaluations = 0;

        for _ in 0..self.settings.samples {
            let selection: Vec<bool> = (0..n).map(|_| rng.gen_bool(0.5)).collect();
            if !selection.iter().any(|&s| s) {
                continue;
            }
            let candidate = Candidate::evaluate(problem, selection);
            evaluations += 1;
            track_best(&mut best, &candidate);
        }

        debug!(
            evaluations,
            best = best.as_ref().map(|b| b.objective),
            violation = best.as_ref().map(|b| b.violation),
            "monte carlo search finished"
        );
        heuristic_outcome(problem, best, self.settings.samples, evaluations)
    }
}
