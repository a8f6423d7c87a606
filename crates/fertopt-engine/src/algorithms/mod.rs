//! The six interchangeable selection algorithms and the registry that
//! dispatches to them.

mod annealing;
mod dynamic;
mod genetic;
mod linear;
mod monte_carlo;
mod swarm;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;

use fertopt_lp::LpError;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::OptimizerError;
use crate::model::ConvergenceInfo;
use crate::problem::{OptimizationProblem, to_weights};
use crate::settings::Settings;

pub use annealing::SimulatedAnnealing;
pub use dynamic::CardinalityDynamicProgram;
pub use genetic::GeneticAlgorithm;
pub use linear::LinearRelaxation;
pub use monte_carlo::MonteCarloSearch;
pub use swarm::ParticleSwarm;

/// Available solution algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    LinearProgramming,
    DynamicProgramming,
    #[serde(alias = "monte_carlo")]
    StochasticOptimization,
    GeneticAlgorithm,
    SimulatedAnnealing,
    ParticleSwarm,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 6] = [
        AlgorithmKind::LinearProgramming,
        AlgorithmKind::DynamicProgramming,
        AlgorithmKind::StochasticOptimization,
        AlgorithmKind::GeneticAlgorithm,
        AlgorithmKind::SimulatedAnnealing,
        AlgorithmKind::ParticleSwarm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AlgorithmKind::LinearProgramming => "linear_programming",
            AlgorithmKind::DynamicProgramming => "dynamic_programming",
            AlgorithmKind::StochasticOptimization => "stochastic_optimization",
            AlgorithmKind::GeneticAlgorithm => "genetic_algorithm",
            AlgorithmKind::SimulatedAnnealing => "simulated_annealing",
            AlgorithmKind::ParticleSwarm => "particle_swarm",
        }
    }

    /// Whether the algorithm consumes randomness
    pub fn is_stochastic(self) -> bool {
        !matches!(self, AlgorithmKind::LinearProgramming | AlgorithmKind::DynamicProgramming)
    }

    fn index(self) -> usize {
        match self {
            AlgorithmKind::LinearProgramming => 0,
            AlgorithmKind::DynamicProgramming => 1,
            AlgorithmKind::StochasticOptimization => 2,
            AlgorithmKind::GeneticAlgorithm => 3,
            AlgorithmKind::SimulatedAnnealing => 4,
            AlgorithmKind::ParticleSwarm => 5,
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmKind {
    type Err = OptimizerError;

    /// Parse an algorithm selector (case-insensitive, common abbreviations accepted)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear_programming" | "lp" => Ok(AlgorithmKind::LinearProgramming),
            "dynamic_programming" | "dp" => Ok(AlgorithmKind::DynamicProgramming),
            "stochastic_optimization" | "monte_carlo" => Ok(AlgorithmKind::StochasticOptimization),
            "genetic_algorithm" | "ga" => Ok(AlgorithmKind::GeneticAlgorithm),
            "simulated_annealing" | "sa" => Ok(AlgorithmKind::SimulatedAnnealing),
            "particle_swarm" | "pso" => Ok(AlgorithmKind::ParticleSwarm),
            other => Err(OptimizerError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// What a solver hands back: one weight per method plus diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub weights: Vec<f64>,
    pub objective_value: f64,
    pub constraint_violations: Vec<String>,
    pub convergence: ConvergenceInfo,
}

impl SolverOutcome {
    fn failed(failure: &SolverFailure) -> Self {
        Self {
            weights: Vec::new(),
            objective_value: f64::INFINITY,
            constraint_violations: failure.violations(),
            convergence: ConvergenceInfo::failed(failure.to_string()),
        }
    }
}

/// A single algorithm run that produced no usable selection
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverFailure {
    #[error("Linear program rejected: {0}")]
    Program(#[from] LpError),
    #[error("Linear relaxation is infeasible")]
    Infeasible { violations: Vec<String> },
    #[error("Linear relaxation is unbounded")]
    Unbounded,
    #[error("Simplex did not converge within {0} pivots")]
    NotConverged(usize),
    #[error("No selection count satisfies the cardinality constraints")]
    NoAdmissibleCardinality,
    #[error("Search produced no candidate selecting at least one method")]
    NoCandidate,
    #[error("{algorithm} aborted: {message}")]
    Aborted { algorithm: AlgorithmKind, message: String },
}

impl SolverFailure {
    /// Messages for the result's `constraint_violations`; never empty
    pub fn violations(&self) -> Vec<String> {
        match self {
            SolverFailure::Infeasible { violations } if !violations.is_empty() => violations.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Uniform contract shared by every algorithm
pub trait Algorithm: Send + Sync {
    fn kind(&self) -> AlgorithmKind;

    /// Deterministic algorithms ignore `rng`
    fn solve(&self, problem: &OptimizationProblem, rng: &mut dyn RngCore) -> Result<SolverOutcome, SolverFailure>;
}

/// Create an algorithm instance configured from `settings`
pub fn create_algorithm(kind: AlgorithmKind, settings: &Settings) -> Box<dyn Algorithm> {
    match kind {
        AlgorithmKind::LinearProgramming => Box::new(LinearRelaxation::new(&settings.linear_programming)),
        AlgorithmKind::DynamicProgramming => Box::new(CardinalityDynamicProgram),
        AlgorithmKind::StochasticOptimization => Box::new(MonteCarloSearch::new(settings.monte_carlo.clone())),
        AlgorithmKind::GeneticAlgorithm => Box::new(GeneticAlgorithm::new(settings.genetic.clone(), settings.penalty_weight)),
        AlgorithmKind::SimulatedAnnealing => {
            Box::new(SimulatedAnnealing::new(settings.annealing.clone(), settings.penalty_weight))
        }
        AlgorithmKind::ParticleSwarm => Box::new(ParticleSwarm::new(settings.swarm.clone(), settings.penalty_weight)),
    }
}

/// Dispatch table built once; read-only afterwards
pub struct SolverRegistry {
    algorithms: Vec<Box<dyn Algorithm>>,
}

impl SolverRegistry {
    pub fn new(settings: &Settings) -> Self {
        Self {
            algorithms: AlgorithmKind::ALL.iter().map(|&kind| create_algorithm(kind, settings)).collect(),
        }
    }

    pub fn get(&self, kind: AlgorithmKind) -> &dyn Algorithm {
        self.algorithms[kind.index()].as_ref()
    }

    /// Run one algorithm. Failures (including panics inside the algorithm)
    /// become a failed outcome with an infinite objective.
    pub fn run(&self, kind: AlgorithmKind, problem: &OptimizationProblem, rng: &mut dyn RngCore) -> SolverOutcome {
        let algorithm = self.get(kind);
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| algorithm.solve(problem, rng)));

        let failure = match attempt {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(failure)) => failure,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                SolverFailure::Aborted { algorithm: kind, message }
            }
        };
        warn!(algorithm = %kind, error = %failure, "solver failed");
        SolverOutcome::failed(&failure)
    }
}

const COMPARISON_TOLERANCE: f64 = 1e-9;

/// A binary selection with its objective and total constraint violation
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    pub selection: Vec<bool>,
    pub objective: f64,
    pub violation: f64,
}

impl Candidate {
    pub fn evaluate(problem: &OptimizationProblem, selection: Vec<bool>) -> Self {
        Self {
            objective: problem.evaluate_binary(&selection),
            violation: problem.total_violation_binary(&selection),
            selection,
        }
    }

    pub fn selected_count(&self) -> usize {
        self.selection.iter().filter(|&&s| s).count()
    }

    /// Objective plus weighted violation; drives acceptance and fitness
    pub fn penalized(&self, weight: f64) -> f64 {
        self.objective + weight * self.violation
    }

    /// Feasibility first: lower violation wins, then lower objective
    pub fn improves_on(&self, other: &Candidate) -> bool {
        if (self.violation - other.violation).abs() > COMPARISON_TOLERANCE {
            self.violation < other.violation
        } else {
            self.objective < other.objective
        }
    }
}

/// Keep `best` up to date with `candidate`
pub(crate) fn track_best(best: &mut Option<Candidate>, candidate: &Candidate) {
    if best.as_ref().is_none_or(|b| candidate.improves_on(b)) {
        *best = Some(candidate.clone());
    }
}

/// Uniform random selection with at least one method chosen
pub(crate) fn random_nonzero_selection(n: usize, rng: &mut dyn RngCore) -> Vec<bool> {
    let mut selection: Vec<bool> = (0..n).map(|_| rng.gen_bool(0.5)).collect();
    ensure_nonzero(&mut selection, rng);
    selection
}

/// Switch on one random method if nothing is selected
pub(crate) fn ensure_nonzero(selection: &mut [bool], rng: &mut dyn RngCore) {
    if !selection.is_empty() && !selection.iter().any(|&s| s) {
        let j = rng.gen_range(0..selection.len());
        selection[j] = true;
    }
}

/// Turn the best candidate of a heuristic search into an outcome
pub(crate) fn heuristic_outcome(
    problem: &OptimizationProblem,
    best: Option<Candidate>,
    iterations: usize,
    evaluations: usize,
) -> Result<SolverOutcome, SolverFailure> {
    let best = best.ok_or(SolverFailure::NoCandidate)?;
    let weights = to_weights(&best.selection);
    let constraint_violations = problem.violations(&weights);
    let feasible = constraint_violations.is_empty();
    let message = if feasible {
        format!("best of {evaluations} evaluations selects {} methods", best.selected_count())
    } else {
        format!("best candidate violates {} constraint rows", constraint_violations.len())
    };

    Ok(SolverOutcome {
        weights,
        objective_value: best.objective,
        constraint_violations,
        convergence: ConvergenceInfo {
            success: true,
            feasible,
            iterations,
            evaluations,
            message,
            final_temperature: None,
        },
    })
}
