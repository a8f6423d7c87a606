use rand::{Rng, RngCore};
use tracing::debug;

use super::{Algorithm, AlgorithmKind, Candidate, SolverFailure, SolverOutcome, heuristic_outcome, track_best};
use crate::problem::{OptimizationProblem, is_selected};
use crate::settings::SwarmSettings;

struct Particle {
    position: Vec<f64>,
    velocity: Vec<f64>,
    best_position: Vec<f64>,
    best: Candidate,
}

/// Binary particle swarm: continuous positions in [0, 1] are thresholded at
/// 0.5 into a selection every iteration.
pub struct ParticleSwarm {
    settings: SwarmSettings,
    penalty_weight: f64,
}

impl ParticleSwarm {
    pub fn new(settings: SwarmSettings, penalty_weight: f64) -> Self {
        Self { settings, penalty_weight }
    }

    /// Threshold a position, lifting one random coordinate above 0.5 when the
    /// particle would select nothing
    fn binarize(position: &mut [f64], rng: &mut dyn RngCore) -> Vec<bool> {
        let mut selection: Vec<bool> = position.iter().map(|&x| is_selected(x)).collect();
        if !selection.iter().any(|&s| s) {
            let j = rng.gen_range(0..position.len());
            position[j] = rng.gen_range(0.75..=1.0);
            selection[j] = true;
        }
        selection
    }

    fn better(&self, a: &Candidate, b: &Candidate) -> bool {
        a.penalized(self.penalty_weight) < b.penalized(self.penalty_weight)
    }
}

impl Algorithm for ParticleSwarm {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::ParticleSwarm
    }

    fn solve(&self, problem: &OptimizationProblem, rng: &mut dyn RngCore) -> Result<SolverOutcome, SolverFailure> {
        let n = problem.num_methods();
        let s = &self.settings;

        let mut swarm: Vec<Particle> = (0..s.particles)
            .map(|_| {
                let mut position: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..=1.0)).collect();
                let velocity = (0..n).map(|_| rng.gen_range(-1.0..=1.0)).collect();
                let selection = Self::binarize(&mut position, rng);
                let best = Candidate::evaluate(problem, selection);
                Particle {
                    best_position: position.clone(),
                    position,
                    velocity,
                    best,
                }
            })
            .collect();
        let mut evaluations = swarm.len();

        let mut leader = 0;
        for (i, particle) in swarm.iter().enumerate() {
            if self.better(&particle.best, &swarm[leader].best) {
                leader = i;
            }
        }
        let mut global_position = swarm[leader].best_position.clone();
        let mut global = swarm[leader].best.clone();
        let mut best: Option<Candidate> = None;
        for particle in &swarm {
            track_best(&mut best, &particle.best);
        }

        for iteration in 0..s.iterations {
            for particle in swarm.iter_mut() {
                for d in 0..n {
                    let r1: f64 = rng.gen_range(0.0..1.0);
                    let r2: f64 = rng.gen_range(0.0..1.0);
                    let x = particle.position[d];
                    let v = s.inertia_weight * particle.velocity[d]
                        + s.cognitive_coefficient * r1 * (particle.best_position[d] - x)
                        + s.social_coefficient * r2 * (global_position[d] - x);
                    particle.velocity[d] = v.clamp(-s.max_velocity, s.max_velocity);
                    particle.position[d] = (x + particle.velocity[d]).clamp(0.0, 1.0);
                }

                let selection = Self::binarize(&mut particle.position, rng);
                let candidate = Candidate::evaluate(problem, selection);
                evaluations += 1;
                track_best(&mut best, &candidate);

                if self.better(&candidate, &particle.best) {
                    particle.best_position = particle.position.clone();
                    particle.best = candidate;
                    if self.better(&particle.best, &global) {
                        global_position = particle.best_position.clone();
                        global = particle.best.clone();
                    }
                }
            }

            if iteration % 25 == 0 {
                debug!(iteration, global = global.objective, "particle swarm progress");
            }
        }

        heuristic_outcome(problem, best, s.iterations, evaluations)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{cost_capped_problem, problem_with};
    use super::*;
    use crate::model::OptimizationObjective;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_binarize_reseeds_empty_particle() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut position = vec![0.1, 0.2, 0.5];
        let selection = ParticleSwarm::binarize(&mut position, &mut rng);

        assert_eq!(selection.iter().filter(|&&s| s).count(), 1);
        assert_eq!(position.iter().filter(|&&x| is_selected(x)).count(), 1);
    }

    #[test]
    fn test_swarm_finds_cheapest_pair() {
        let constraints = [crate::model::OptimizationConstraint::selection(
            crate::model::ConstraintOperator::Eq,
            2.0,
        )];
        let problem = problem_with(
            &[(40.0, 0.0), (15.0, 0.0), (90.0, 0.0), (25.0, 0.0), (70.0, 0.0)],
            OptimizationObjective::MinimizeCost,
            &constraints,
        );
        let pso = ParticleSwarm::new(SwarmSettings::default(), 1e6);

        let outcome = pso.solve(&problem, &mut ChaCha8Rng::seed_from_u64(33)).unwrap();

        assert_eq!(outcome.weights, vec![0.0, 1.0, 0.0, 1.0, 0.0]);
        assert!(outcome.convergence.feasible);
        assert_eq!(outcome.objective_value, 40.0);
    }

    #[test]
    fn test_cost_cap_excludes_unconstrained_optimum() {
        let problem = cost_capped_problem();
        let pso = ParticleSwarm::new(SwarmSettings::default(), 1e6);
        for seed in 0..5 {
            let outcome = pso.solve(&problem, &mut ChaCha8Rng::seed_from_u64(seed)).unwrap();

            assert_eq!(outcome.weights, vec![1.0, 1.0, 0.0], "seed {seed}");
            assert_eq!(outcome.objective_value, -160.0);
            assert!(outcome.convergence.feasible);
            assert!(outcome.constraint_violations.is_empty());
        }
    }
}
