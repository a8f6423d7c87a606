//! Objective coefficients. Every objective is expressed as a minimization, so
//! profit-like quantities enter negated.

use crate::error::OptimizerError;
use crate::model::{MethodCostEstimate, OptimizationObjective};
use crate::scenario::{PRICE_VARIATION_FACTOR, ScenarioParameters, ScenarioType, WEATHER_IMPACT_FACTOR};

const BALANCED_COST_WEIGHT: f64 = 0.4;
const BALANCED_PROFIT_WEIGHT: f64 = 0.4;
const BALANCED_EFFICIENCY_WEIGHT: f64 = 0.2;

/// Coefficient contributed by a single method
pub fn method_coefficient(estimate: &MethodCostEstimate, objective: OptimizationObjective) -> f64 {
    let cost = estimate.total_cost_per_acre;
    let profit = estimate.profit();

    match objective {
        OptimizationObjective::MaximizeProfit => -profit,
        OptimizationObjective::MaximizeRoi => {
            if cost == 0.0 {
                0.0
            } else {
                -(profit / cost)
            }
        }
        OptimizationObjective::BalancedOptimization => {
            BALANCED_COST_WEIGHT * cost
                + BALANCED_PROFIT_WEIGHT * -profit
                + BALANCED_EFFICIENCY_WEIGHT * -estimate.efficiency_score
        }
        // No dedicated formulation: rank by cost
        OptimizationObjective::MinimizeCost
        | OptimizationObjective::MinimizeRisk
        | OptimizationObjective::MaximizeEfficiency => cost,
    }
}

/// Multiplier a scenario applies to every coefficient (1.0 for types that only
/// contribute constraints or stress tests)
pub fn scenario_multiplier(scenario: &ScenarioParameters) -> f64 {
    match scenario.scenario_type {
        ScenarioType::Price => scenario.factor(PRICE_VARIATION_FACTOR),
        ScenarioType::Weather => scenario.factor(WEATHER_IMPACT_FACTOR),
        _ => 1.0,
    }
}

/// Build one coefficient per method.
///
/// Scenarios are applied in the order given. Each price or weather scenario
/// rescales the vector produced by the previous ones, so callers that mix
/// scenarios should pass them in the order they want them compounded.
pub fn build_objective(
    estimates: &[MethodCostEstimate],
    objective: OptimizationObjective,
    scenarios: &[ScenarioParameters],
) -> Result<Vec<f64>, OptimizerError> {
    let mut coefficients: Vec<f64> = estimates.iter().map(|e| method_coefficient(e, objective)).collect();

    for scenario in scenarios {
        let multiplier = scenario_multiplier(scenario);
        if multiplier != 1.0 {
            coefficients.iter_mut().for_each(|c| *c *= multiplier);
        }
    }

    if let Some(bad) = coefficients.iter().position(|c| !c.is_finite()) {
        return Err(OptimizerError::NonFiniteCoefficient(estimates[bad].method_id.clone()));
    }
    Ok(coefficients)
}
