//! Robustness of a found selection under cost and scenario perturbations.

use serde::{Deserialize, Serialize};

use crate::model::MethodCostEstimate;
use crate::objective::build_objective;
use crate::problem::OptimizationProblem;
use crate::risk::{ParameterRisk, RiskAssessment, RiskLevel, assess_risk};
use crate::scenario::{PRICE_VARIATION_FACTOR, ScenarioParameters, ScenarioType, WEATHER_IMPACT_FACTOR};

const PRICE_RISK_THRESHOLD: f64 = 0.2;
const WEATHER_RISK_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSensitivityPoint {
    pub cost_multiplier: f64,
    pub objective_value: f64,
    pub change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioImpact {
    pub scenario: String,
    pub scenario_type: ScenarioType,
    pub factor: f64,
    /// `(factor - 1) * 100`
    pub impact_on_objective: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityAnalysis {
    pub base_objective_value: f64,
    pub cost_sensitivity: Vec<CostSensitivityPoint>,
    pub scenario_impacts: Vec<ScenarioImpact>,
    pub risk_assessment: RiskAssessment,
}

fn change_percent(value: f64, base: f64) -> f64 {
    if base.abs() < 1e-12 {
        0.0
    } else {
        (value - base) / base.abs() * 100.0
    }
}

/// Objective of `weights` with every method's cost scaled by `multiplier`.
/// Revenue and efficiency are held fixed.
fn scaled_cost_objective(problem: &OptimizationProblem, weights: &[f64], multiplier: f64) -> Option<f64> {
    let scaled: Vec<MethodCostEstimate> = problem
        .method_costs
        .iter()
        .map(|e| MethodCostEstimate {
            total_cost_per_acre: e.total_cost_per_acre * multiplier,
            ..e.clone()
        })
        .collect();
    let coefficients = build_objective(&scaled, problem.objective, &problem.scenarios).ok()?;
    Some(coefficients.iter().zip(weights).map(|(c, x)| c * x).sum())
}

/// Impact of a price or weather scenario; other scenario types only shape
/// constraints and are not scored here
pub fn scenario_impact(scenario: &ScenarioParameters) -> Option<ScenarioImpact> {
    let (factor, threshold) = match scenario.scenario_type {
        ScenarioType::Price => (scenario.factor(PRICE_VARIATION_FACTOR), PRICE_RISK_THRESHOLD),
        ScenarioType::Weather => (scenario.factor(WEATHER_IMPACT_FACTOR), WEATHER_RISK_THRESHOLD),
        _ => return None,
    };
    let deviation = factor - 1.0;
    Some(ScenarioImpact {
        scenario: scenario.label(),
        scenario_type: scenario.scenario_type,
        factor,
        impact_on_objective: deviation * 100.0,
        risk_level: if deviation.abs() > threshold {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        },
    })
}

/// Perturb costs and scenarios around `weights` and assess the resulting risk
pub fn analyze_sensitivity(problem: &OptimizationProblem, weights: &[f64], cost_multipliers: &[f64]) -> SensitivityAnalysis {
    let base = problem.evaluate(weights);

    let cost_sensitivity: Vec<CostSensitivityPoint> = cost_multipliers
        .iter()
        .filter_map(|&m| {
            let value = scaled_cost_objective(problem, weights, m)?;
            Some(CostSensitivityPoint {
                cost_multiplier: m,
                objective_value: value,
                change_percent: change_percent(value, base),
            })
        })
        .collect();

    let scenario_impacts: Vec<ScenarioImpact> = problem.scenarios.iter().filter_map(scenario_impact).collect();

    // Scenarios keep the level rated against their own threshold
    let cost_changes: Vec<f64> = cost_sensitivity.iter().map(|p| p.change_percent).collect();
    let parameters = std::iter::once(ParameterRisk::from_changes("cost", &cost_changes)).chain(
        scenario_impacts
            .iter()
            .map(|s| ParameterRisk::classified(s.scenario.as_str(), s.impact_on_objective, s.risk_level)),
    );
    let risk_assessment = assess_risk(parameters);

    SensitivityAnalysis {
        base_objective_value: base,
        cost_sensitivity,
        scenario_impacts,
        risk_assessment,
    }
}
