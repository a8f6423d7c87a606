use rand::{Rng, RngCore};
use tracing::debug;

use super::{
    Algorithm, AlgorithmKind, Candidate, SolverFailure, SolverOutcome, ensure_nonzero, heuristic_outcome,
    random_nonzero_selection, track_best,
};
use crate::problem::OptimizationProblem;
use crate::settings::AnnealingSettings;

/// Single bit-flip annealing with geometric cooling and Metropolis acceptance.
/// Stops when the temperature falls to the final temperature or the iteration
/// budget runs out, whichever comes first.
pub struct SimulatedAnnealing {
    settings: AnnealingSettings,
    penalty_weight: f64,
}

impl SimulatedAnnealing {
    pub fn new(settings: AnnealingSettings, penalty_weight: f64) -> Self {
        Self { settings, penalty_weight }
    }

    fn neighbour(&self, current: &[bool], rng: &mut dyn RngCore) -> Vec<bool> {
        let mut next = current.to_vec();
        let j = rng.gen_range(0..next.len());
        next[j] = !next[j];
        if !next.iter().any(|&s| s) {
            return random_nonzero_selection(next.len(), rng);
        }
        next
    }
}

impl Algorithm for SimulatedAnnealing {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::SimulatedAnnealing
    }

    fn solve(&self, problem: &OptimizationProblem, rng: &mut dyn RngCore) -> Result<SolverOutcome, SolverFailure> {
        let n = problem.num_methods();
        let mut start: Vec<bool> = (0..n).map(|_| rng.gen_bool(0.5)).collect();
        ensure_nonzero(&mut start, rng);

        let mut current = Candidate::evaluate(problem, start);
        let mut best = Some(current.clone());
        let mut temperature = self.settings.initial_temperature;
        let mut iterations = 0;
        let mut accepted = 0;

        while iterations < self.settings.max_iterations && temperature > self.settings.final_temperature {
            let candidate = Candidate::evaluate(problem, self.neighbour(&current.selection, rng));
            let delta = candidate.penalized(self.penalty_weight) - current.penalized(self.penalty_weight);

            if delta <= 0.0 || rng.gen_range(0.0..1.0) < (-delta / temperature).exp() {
                track_best(&mut best, &candidate);
                current = candidate;
                accepted += 1;
            }

            temperature *= self.settings.cooling_rate;
            iterations += 1;
        }

        debug!(iterations, accepted, temperature, "simulated annealing finished");
        let mut outcome = heuristic_outcome(problem, best, iterations, iterations + 1)?;
        outcome.convergence.final_temperature = Some(temperature);
        Ok(outcome)
    }
}
