//! Tunable parameters for the solver registry.
//!
//! Defaults reproduce the reference parameterization of every algorithm. Any
//! field may be omitted from a JSON settings document.

use serde::{Deserialize, Serialize};

use crate::error::OptimizerError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearProgrammingSettings {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for LinearProgrammingSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloSettings {
    pub samples: usize,
}

impl Default for MonteCarloSettings {
    fn default() -> Self {
        Self { samples: 1000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticSettings {
    pub population_size: usize,
    pub generations: usize,
    pub tournament_size: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
}

impl Default for GeneticSettings {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            tournament_size: 3,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingSettings {
    pub initial_temperature: f64,
    pub final_temperature: f64,
    pub cooling_rate: f64,
    pub max_iterations: usize,
}

impl Default for AnnealingSettings {
    fn default() -> Self {
        Self {
            initial_temperature: 1000.0,
            final_temperature: 0.1,
            cooling_rate: 0.95,
            max_iterations: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmSettings {
    pub particles: usize,
    pub iterations: usize,
    pub inertia_weight: f64,
    pub cognitive_coefficient: f64,
    pub social_coefficient: f64,
    /// Velocity components are clamped to [-max_velocity, max_velocity]
    pub max_velocity: f64,
}

impl Default for SwarmSettings {
    fn default() -> Self {
        Self {
            particles: 30,
            iterations: 100,
            inertia_weight: 0.9,
            cognitive_coefficient: 2.0,
            social_coefficient: 2.0,
            max_velocity: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub linear_programming: LinearProgrammingSettings,
    pub monte_carlo: MonteCarloSettings,
    pub genetic: GeneticSettings,
    pub annealing: AnnealingSettings,
    pub swarm: SwarmSettings,
    /// Weight applied to total constraint violation by the genetic, annealing
    /// and swarm solvers
    pub penalty_weight: f64,
    /// Cost multipliers used by the sensitivity analyzer
    pub cost_multipliers: Vec<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            linear_programming: LinearProgrammingSettings::default(),
            monte_carlo: MonteCarloSettings::default(),
            genetic: GeneticSettings::default(),
            annealing: AnnealingSettings::default(),
            swarm: SwarmSettings::default(),
            penalty_weight: 1e6,
            cost_multipliers: vec![0.8, 0.9, 1.0, 1.1, 1.2],
        }
    }
}

impl Settings {
    /// Parse and validate a JSON settings document
    pub fn from_json_str(json: &str) -> Result<Self, OptimizerError> {
        let settings: Settings =
            serde_json::from_str(json).map_err(|e| OptimizerError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), OptimizerError> {
        let invalid = |msg: &str| Err(OptimizerError::InvalidSettings(msg.to_string()));

        if self.monte_carlo.samples == 0 {
            return invalid("monte_carlo.samples must be positive");
        }
        let ga = &self.genetic;
        if ga.population_size < 2 || ga.generations == 0 {
            return invalid("genetic population must be at least 2 with at least one generation");
        }
        if ga.tournament_size == 0 {
            return invalid("genetic.tournament_size must be positive");
        }
        if !(0.0..=1.0).contains(&ga.crossover_rate) || !(0.0..=1.0).contains(&ga.mutation_rate) {
            return invalid("genetic rates must lie in [0, 1]");
        }
        let sa = &self.annealing;
        if !(sa.final_temperature > 0.0 && sa.initial_temperature > sa.final_temperature) {
            return invalid("annealing temperatures must satisfy initial > final > 0");
        }
        if !(sa.cooling_rate > 0.0 && sa.cooling_rate < 1.0) {
            return invalid("annealing.cooling_rate must lie in (0, 1)");
        }
        let pso = &self.swarm;
        if pso.particles == 0 || pso.iterations == 0 {
            return invalid("swarm needs at least one particle and one iteration");
        }
        if !(pso.max_velocity > 0.0) {
            return invalid("swarm.max_velocity must be positive");
        }
        if !(self.penalty_weight.is_finite() && self.penalty_weight > 0.0) {
            return invalid("penalty_weight must be positive and finite");
        }
        if self.cost_multipliers.iter().any(|m| !(m.is_finite() && *m > 0.0)) {
            return invalid("cost multipliers must be positive and finite");
        }
        Ok(())
    }
}
