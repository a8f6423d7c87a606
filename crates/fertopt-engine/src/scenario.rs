//! Uncertainty scenarios used to adjust objectives, add constraints and
//! stress-test a chosen selection.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OptimizerError;

pub const PRICE_VARIATION_FACTOR: &str = "price_variation_factor";
pub const WEATHER_IMPACT_FACTOR: &str = "weather_impact_factor";
pub const WEATHER_TOLERANCE: &str = "weather_tolerance";
pub const MAX_COST_PER_ACRE: &str = "max_cost_per_acre";

/// Factors sampled jointly for comprehensive scenarios, in matrix order
pub const CORRELATED_FACTORS: [&str; 5] = ["fertilizer_price", "fuel_price", "labor_price", "crop_price", "yield"];

/// Cross-factor correlation for comprehensive sampling (order of [`CORRELATED_FACTORS`])
pub const CORRELATION_MATRIX: [[f64; 5]; 5] = [
    [1.0, 0.6, 0.4, -0.3, 0.2],
    [0.6, 1.0, 0.5, -0.2, 0.1],
    [0.4, 0.5, 1.0, -0.1, 0.3],
    [-0.3, -0.2, -0.1, 1.0, 0.8],
    [0.2, 0.1, 0.3, 0.8, 1.0],
];

/// Standard deviation of each correlated factor around 1.0
const FACTOR_VOLATILITY: [f64; 5] = [0.15, 0.12, 0.08, 0.15, 0.10];
const FACTOR_FLOOR: f64 = 0.5;
const FACTOR_CEILING: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    #[serde(alias = "price_scenario")]
    Price,
    #[serde(alias = "weather_scenario")]
    Weather,
    #[serde(alias = "yield_scenario")]
    Yield,
    #[serde(alias = "cost_scenario")]
    Cost,
    #[serde(alias = "market_scenario")]
    Market,
    #[serde(alias = "comprehensive_scenario")]
    Comprehensive,
}

impl ScenarioType {
    pub const ALL: [ScenarioType; 6] = [
        ScenarioType::Price,
        ScenarioType::Weather,
        ScenarioType::Yield,
        ScenarioType::Cost,
        ScenarioType::Market,
        ScenarioType::Comprehensive,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ScenarioType::Price => "Price",
            ScenarioType::Weather => "Weather",
            ScenarioType::Yield => "Yield",
            ScenarioType::Cost => "Cost",
            ScenarioType::Market => "Market",
            ScenarioType::Comprehensive => "Comprehensive",
        }
    }
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScenarioType {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let name = lowered.strip_suffix("_scenario").unwrap_or(lowered.as_str());
        ScenarioType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(name))
            .ok_or_else(|| OptimizerError::UnknownScenarioType(s.to_string()))
    }
}

/// One named perturbation of economic, weather or yield parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParameters {
    pub scenario_type: ScenarioType,
    pub parameters: BTreeMap<String, f64>,
    pub probability: f64,
    #[serde(default)]
    pub description: String,
}

impl ScenarioParameters {
    pub fn new(scenario_type: ScenarioType, probability: f64, description: impl Into<String>) -> Self {
        Self {
            scenario_type,
            parameters: BTreeMap::new(),
            probability,
            description: description.into(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).copied()
    }

    /// Multiplicative factor, neutral when absent
    pub fn factor(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(1.0)
    }

    pub fn label(&self) -> String {
        if self.description.is_empty() {
            format!("{} scenario", self.scenario_type)
        } else {
            self.description.clone()
        }
    }
}

struct ParameterRange {
    name: &'static str,
    low: f64,
    high: f64,
}

const fn range(name: &'static str, low: f64, high: f64) -> ParameterRange {
    ParameterRange { name, low, high }
}

const PRICE_RANGES: [ParameterRange; 3] = [
    range(PRICE_VARIATION_FACTOR, 0.7, 1.3),
    range("fuel_price_factor", 0.8, 1.4),
    range("labor_price_factor", 0.9, 1.2),
];
const WEATHER_RANGES: [ParameterRange; 3] = [
    range(WEATHER_IMPACT_FACTOR, 0.7, 1.3),
    range("yield_impact", 0.1, 0.3),
    range(WEATHER_TOLERANCE, 0.3, 0.8),
];
const YIELD_RANGES: [ParameterRange; 1] = [range("yield_variation_factor", 0.8, 1.2)];
const COST_RANGES: [ParameterRange; 1] = [range("cost_variation_factor", 0.8, 1.25)];
const MARKET_RANGES: [ParameterRange; 2] = [
    range("market_demand_factor", 0.85, 1.15),
    range("price_volatility", 0.05, 0.25),
];

fn independent_ranges(scenario_type: ScenarioType) -> &'static [ParameterRange] {
    match scenario_type {
        ScenarioType::Price => &PRICE_RANGES,
        ScenarioType::Weather => &WEATHER_RANGES,
        ScenarioType::Yield => &YIELD_RANGES,
        ScenarioType::Cost => &COST_RANGES,
        ScenarioType::Market => &MARKET_RANGES,
        ScenarioType::Comprehensive => &[],
    }
}

/// Generates and validates scenarios. Holds the Cholesky factor of
/// [`CORRELATION_MATRIX`], computed once.
#[derive(Debug, Clone)]
pub struct ScenarioEngine {
    correlation_factor: [[f64; 5]; 5],
}

impl Default for ScenarioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioEngine {
    pub fn new() -> Self {
        let correlation_factor = cholesky(&CORRELATION_MATRIX).unwrap_or_else(|| {
            debug!("correlation matrix is not positive definite, sampling factors independently");
            identity()
        });
        Self { correlation_factor }
    }

    pub fn correlation_matrix(&self) -> &'static [[f64; 5]; 5] {
        &CORRELATION_MATRIX
    }

    /// Draw `count` equally likely scenarios of one type
    pub fn generate(&self, scenario_type: ScenarioType, count: usize, rng: &mut dyn RngCore) -> Vec<ScenarioParameters> {
        let probability = if count == 0 { 0.0 } else { 1.0 / count as f64 };

        (0..count)
            .map(|i| {
                let description = format!("{} scenario {} of {}", scenario_type, i + 1, count);
                let mut scenario = ScenarioParameters::new(scenario_type, probability, description);
                if scenario_type == ScenarioType::Comprehensive {
                    for (name, value) in self.correlated_draw(rng) {
                        scenario.parameters.insert(name, value);
                    }
                } else {
                    for r in independent_ranges(scenario_type) {
                        scenario.parameters.insert(r.name.to_string(), rng.gen_range(r.low..=r.high));
                    }
                }
                scenario
            })
            .collect()
    }

    /// One joint draw of the correlated factors: `1 + sigma * (L z)`, clamped
    fn correlated_draw(&self, rng: &mut dyn RngCore) -> Vec<(String, f64)> {
        let z: Vec<f64> = (0..CORRELATED_FACTORS.len()).map(|_| standard_normal(rng)).collect();

        let mut draws = Vec::with_capacity(CORRELATED_FACTORS.len() + 1);
        for (i, name) in CORRELATED_FACTORS.iter().enumerate() {
            let correlated: f64 = (0..=i).map(|k| self.correlation_factor[i][k] * z[k]).sum();
            let value = (1.0 + FACTOR_VOLATILITY[i] * correlated).clamp(FACTOR_FLOOR, FACTOR_CEILING);
            draws.push((format!("{name}_factor"), value));
        }
        let fertilizer = draws[0].1;
        draws.push((PRICE_VARIATION_FACTOR.to_string(), fertilizer));
        draws
    }

    pub fn validate(&self, scenario: &ScenarioParameters) -> Result<(), OptimizerError> {
        let invalid = |reason: String| OptimizerError::InvalidScenario {
            scenario: scenario.label(),
            reason,
        };

        if !(0.0..=1.0).contains(&scenario.probability) {
            return Err(invalid(format!("probability {} outside [0, 1]", scenario.probability)));
        }
        for (name, &value) in &scenario.parameters {
            if !value.is_finite() {
                return Err(invalid(format!("parameter {name} is not finite")));
            }
            if name.ends_with("_factor") && value <= 0.0 {
                return Err(invalid(format!("factor {name} must be positive, got {value}")));
            }
        }
        if scenario.get(MAX_COST_PER_ACRE).is_some_and(|v| v < 0.0) {
            return Err(invalid(format!("{MAX_COST_PER_ACRE} must not be negative")));
        }
        if scenario.get(WEATHER_TOLERANCE).is_some_and(|v| v < 0.0) {
            return Err(invalid(format!("{WEATHER_TOLERANCE} must not be negative")));
        }
        Ok(())
    }

    /// Validate each scenario and check the probabilities do not exceed one in total
    pub fn validate_set(&self, scenarios: &[ScenarioParameters]) -> Result<(), OptimizerError> {
        for scenario in scenarios {
            self.validate(scenario)?;
        }
        let total: f64 = scenarios.iter().map(|s| s.probability).sum();
        if total > 1.0 + 1e-9 {
            return Err(OptimizerError::InvalidScenario {
                scenario: "scenario set".to_string(),
                reason: format!("probabilities sum to {total:.4}"),
            });
        }
        Ok(())
    }
}

/// Box-Muller transform over two uniform draws
fn standard_normal(rng: &mut dyn RngCore) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn identity() -> [[f64; 5]; 5] {
    let mut m = [[0.0; 5]; 5];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

/// Lower-triangular L with L * L^T = m, or None if m is not positive definite
fn cholesky(m: &[[f64; 5]; 5]) -> Option<[[f64; 5]; 5]> {
    let mut l = [[0.0; 5]; 5];
    for i in 0..5 {
        for j in 0..=i {
            let partial: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let pivot = m[i][i] - partial;
                if pivot <= 0.0 {
                    return None;
                }
                l[i][j] = pivot.sqrt();
            } else {
                l[i][j] = (m[i][j] - partial) / l[j][j];
            }
        }
    }
    Some(l)
}
