//! Batch scenario sweep: re-optimize the same request under many generated
//! scenarios and summarize how stable the answer is.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::algorithms::AlgorithmKind;
use crate::error::OptimizerError;
use crate::scenario::ScenarioType;
use crate::service::{OptimizationRequest, OptimizationService, rng_for};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessReport {
    pub scenario_type: ScenarioType,
    pub algorithm: AlgorithmKind,
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub mean_objective: Option<f64>,
    /// Population standard deviation over successful runs
    pub std_dev_objective: Option<f64>,
    pub min_objective: Option<f64>,
    pub max_objective: Option<f64>,
    /// Share of successful runs that selected each method
    pub selection_frequency: BTreeMap<String, f64>,
}

impl OptimizationService {
    /// Optimize `request` once per generated scenario.
    ///
    /// Each run sees the request's own scenarios followed by one generated
    /// scenario. The request's scenarios are validated as a set once and each
    /// generated scenario on its own, so probabilities never sum across the
    /// two. Sensitivity analysis is skipped. Runs that fail are logged and
    /// counted, and the statistics cover the successful runs only.
    pub fn robustness_sweep(
        &self,
        request: &OptimizationRequest,
        scenario_type: ScenarioType,
        count: usize,
    ) -> Result<RobustnessReport, OptimizerError> {
        let method_costs = self.cost_estimates(request)?;
        self.scenario_engine().validate_set(&request.scenarios)?;
        let mut rng = rng_for(request.seed);
        let generated = self.scenario_engine().generate(scenario_type, count, &mut rng);

        let mut objectives = Vec::with_capacity(count);
        let mut selections: BTreeMap<String, usize> = BTreeMap::new();
        let mut failed = 0;

        for (i, scenario) in generated.into_iter().enumerate() {
            let started = Instant::now();
            if let Err(e) = self.scenario_engine().validate(&scenario) {
                warn!(run = i, error = %e, "skipping sweep run with an invalid scenario");
                failed += 1;
                continue;
            }
            let mut scenarios = request.scenarios.clone();
            scenarios.push(scenario);

            let problem = match self.build_problem(request, method_costs.clone(), scenarios) {
                Ok(problem) => problem,
                Err(e) => {
                    warn!(run = i, error = %e, "skipping sweep run with an unusable scenario");
                    failed += 1;
                    continue;
                }
            };

            let result = self.solve(&problem, request.algorithm, &mut rng, false, started);
            if !result.is_success() {
                warn!(
                    run = i,
                    reason = result.convergence_info.message.as_str(),
                    "sweep run failed"
                );
                failed += 1;
                continue;
            }

            objectives.push(result.objective_value);
            for id in result.selected_ids() {
                *selections.entry(id.to_string()).or_default() += 1;
            }
        }

        let report = summarize(request, scenario_type, count, failed, &objectives, &selections);
        info!(
            scenario_type = %scenario_type,
            algorithm = %request.algorithm,
            requested = report.requested,
            succeeded = report.succeeded,
            failed = report.failed,
            "robustness sweep finished"
        );
        Ok(report)
    }
}

fn summarize(
    request: &OptimizationRequest,
    scenario_type: ScenarioType,
    requested: usize,
    failed: usize,
    objectives: &[f64],
    selections: &BTreeMap<String, usize>,
) -> RobustnessReport {
    let succeeded = objectives.len();
    let mut report = RobustnessReport {
        scenario_type,
        algorithm: request.algorithm,
        requested,
        succeeded,
        failed,
        mean_objective: None,
        std_dev_objective: None,
        min_objective: None,
        max_objective: None,
        selection_frequency: BTreeMap::new(),
    };
    if succeeded == 0 {
        return report;
    }

    let n = succeeded as f64;
    let mean = objectives.iter().sum::<f64>() / n;
    let variance = objectives.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    report.mean_objective = Some(mean);
    report.std_dev_objective = Some(variance.sqrt());
    report.min_objective = objectives.iter().copied().reduce(f64::min);
    report.max_objective = objectives.iter().copied().reduce(f64::max);
    report.selection_frequency = request
        .methods
        .iter()
        .map(|m| {
            let hits = selections.get(&m.method_id).copied().unwrap_or(0);
            (m.method_id.clone(), hits as f64 / n)
        })
        .collect();
    report
}
