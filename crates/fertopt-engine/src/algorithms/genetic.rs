use rand::{Rng, RngCore};
use tracing::debug;

use super::{
    Algorithm, AlgorithmKind, Candidate, SolverFailure, SolverOutcome, heuristic_outcome, random_nonzero_selection,
    track_best,
};
use crate::problem::OptimizationProblem;
use crate::settings::GeneticSettings;

/// Generational GA over selection bit strings: tournament selection,
/// single-point crossover and bit-flip mutation. The best individual ever seen
/// is returned, not the best of the last generation.
pub struct GeneticAlgorithm {
    settings: GeneticSettings,
    penalty_weight: f64,
}

impl GeneticAlgorithm {
    pub fn new(settings: GeneticSettings, penalty_weight: f64) -> Self {
        Self { settings, penalty_weight }
    }

    /// Higher is better; selecting nothing is never acceptable
    fn fitness(&self, candidate: &Candidate) -> f64 {
        if candidate.selected_count() == 0 {
            f64::NEG_INFINITY
        } else {
            -candidate.penalized(self.penalty_weight)
        }
    }

    fn tournament<'a>(&self, population: &'a [(Candidate, f64)], rng: &mut dyn RngCore) -> &'a Candidate {
        let mut winner = &population[rng.gen_range(0..population.len())];
        for _ in 1..self.settings.tournament_size {
            let challenger = &population[rng.gen_range(0..population.len())];
            if challenger.1 > winner.1 {
                winner = challenger;
            }
        }
        &winner.0
    }

    fn crossover(&self, a: &[bool], b: &[bool], rng: &mut dyn RngCore) -> (Vec<bool>, Vec<bool>) {
        let n = a.len();
        if n > 1 && rng.gen_bool(self.settings.crossover_rate) {
            let point = rng.gen_range(1..n);
            let first = a[..point].iter().chain(&b[point..]).copied().collect();
            let second = b[..point].iter().chain(&a[point..]).copied().collect();
            (first, second)
        } else {
            (a.to_vec(), b.to_vec())
        }
    }

    fn mutate(&self, genes: &mut [bool], rng: &mut dyn RngCore) {
        for gene in genes.iter_mut() {
            if rng.gen_bool(self.settings.mutation_rate) {
                *gene = !*gene;
            }
        }
    }

    fn score(&self, problem: &OptimizationProblem, genes: Vec<bool>) -> (Candidate, f64) {
        let candidate = Candidate::evaluate(problem, genes);
        let fitness = self.fitness(&candidate);
        (candidate, fitness)
    }
}

impl Algorithm for GeneticAlgorithm {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::GeneticAlgorithm
    }

    fn solve(&self, problem: &OptimizationProblem, rng: &mut dyn RngCore) -> Result<SolverOutcome, SolverFailure> {
        let n = problem.num_methods();
        let size = self.settings.population_size;

        let mut population: Vec<(Candidate, f64)> = (0..size)
            .map(|_| {
                let genes = (0..n).map(|_| rng.gen_bool(0.5)).collect();
                self.score(problem, genes)
            })
            .collect();
        let mut evaluations = size;
        let mut best: Option<Candidate> = None;

        for generation in 0..self.settings.generations {
            for (candidate, fitness) in &population {
                if fitness.is_finite() {
                    track_best(&mut best, candidate);
                }
            }

            let mut next = Vec::with_capacity(size);
            while next.len() < size {
                let mother = self.tournament(&population, rng);
                let father = self.tournament(&population, rng);
                let (mut first, mut second) = self.crossover(&mother.selection, &father.selection, rng);
                self.mutate(&mut first, rng);
                self.mutate(&mut second, rng);
                next.push(self.score(problem, first));
                if next.len() < size {
                    next.push(self.score(problem, second));
                }
            }
            evaluations += next.len();
            population = next;

            if generation % 25 == 0 {
                debug!(generation, best = best.as_ref().map(|b| b.objective), "genetic algorithm progress");
            }
        }

        for (candidate, fitness) in &population {
            if fitness.is_finite() {
                track_best(&mut best, candidate);
            }
        }

        // Degenerate case: every individual ever bred was empty
        if best.is_none() {
            let fallback = Candidate::evaluate(problem, random_nonzero_selection(n, rng));
            evaluations += 1;
            best = Some(fallback);
        }

        heuristic_outcome(problem, best, self.settings.generations, evaluations)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{cost_capped_problem, problem_with};
    use super::*;
    use crate::model::{ConstraintOperator, OptimizationConstraint, OptimizationObjective};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ga() -> GeneticAlgorithm {
        GeneticAlgorithm::new(GeneticSettings::default(), 1e6)
    }

    #[test]
    fn test_profit_example_selects_a() {
        let cap = [OptimizationConstraint::selection(ConstraintOperator::Le, 1.0)];
        let problem = problem_with(&[(50.0, 150.0), (80.0, 100.0)], OptimizationObjective::MaximizeProfit, &cap);

        let outcome = ga().solve(&problem, &mut ChaCha8Rng::seed_from_u64(17)).unwrap();

        assert_eq!(outcome.weights, vec![1.0, 0.0]);
        assert_eq!(outcome.objective_value, -100.0);
        assert!(outcome.convergence.feasible);
    }

    #[test]
    fn test_converges_on_eight_methods() {
        let economics: Vec<(f64, f64)> = (0..8).map(|i| (10.0 + i as f64 * 10.0, 65.0)).collect();
        let problem = problem_with(&economics, OptimizationObjective::MaximizeProfit, &[]);

        let outcome = ga().solve(&problem, &mut ChaCha8Rng::seed_from_u64(2024)).unwrap();

        // Profitable methods: cost below 65, i.e. the first six
        let expected: Vec<f64> = (0..8).map(|i| if i < 6 { 1.0 } else { 0.0 }).collect();
        assert_eq!(outcome.weights, expected);
    }

    #[test]
    fn test_crossover_preserves_genes() {
        let algorithm = ga();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let a = vec![true; 6];
        let b = vec![false; 6];
        for _ in 0..20 {
            let (first, second) = algorithm.crossover(&a, &b, &mut rng);
            let ones = first.iter().chain(&second).filter(|&&g| g).count();
            assert_eq!(ones, 6);
        }
    }

    #[test]
    fn test_cost_cap_excludes_unconstrained_optimum() {
        let problem = cost_capped_problem();
        let algorithm = ga();
        for seed in 0..5 {
            let outcome = algorithm.solve(&problem, &mut ChaCha8Rng::seed_from_u64(seed)).unwrap();

            assert_eq!(outcome.weights, vec![1.0, 1.0, 0.0], "seed {seed}");
            assert_eq!(outcome.objective_value, -160.0);
            assert!(outcome.convergence.feasible);
            assert!(outcome.constraint_violations.is_empty());
        }
    }
}
