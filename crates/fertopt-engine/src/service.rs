use std::collections::HashSet;
use std::time::Instant;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::algorithms::{AlgorithmKind, SolverRegistry};
use crate::cost::{CostAnalyzer, join_costs};
use crate::error::OptimizerError;
use crate::model::{
    ApplicationMethod, CropRequirements, Equipment, FertilizerSpecification, FieldConditions, MethodCostEstimate,
    OptimizationConstraint, OptimizationObjective, OptimizationResult, SelectedMethod,
};
use crate::problem::{OptimizationProblem, is_selected};
use crate::scenario::{ScenarioEngine, ScenarioParameters, ScenarioType};
use crate::sensitivity::analyze_sensitivity;
use crate::settings::Settings;

/// Everything the caller supplies for one optimization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub methods: Vec<ApplicationMethod>,
    #[serde(default)]
    pub field_conditions: FieldConditions,
    #[serde(default)]
    pub crop_requirements: CropRequirements,
    #[serde(default)]
    pub fertilizer_specification: FertilizerSpecification,
    #[serde(default)]
    pub available_equipment: Vec<Equipment>,
    pub objective: OptimizationObjective,
    pub algorithm: AlgorithmKind,
    #[serde(default)]
    pub constraints: Vec<OptimizationConstraint>,
    /// Applied in order; see [`crate::objective::build_objective`]
    #[serde(default)]
    pub scenarios: Vec<ScenarioParameters>,
    /// Fixes the random stream of the stochastic algorithms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl OptimizationRequest {
    pub fn new(methods: Vec<ApplicationMethod>, objective: OptimizationObjective, algorithm: AlgorithmKind) -> Self {
        Self {
            methods,
            field_conditions: FieldConditions::default(),
            crop_requirements: CropRequirements::default(),
            fertilizer_specification: FertilizerSpecification::default(),
            available_equipment: Vec::new(),
            objective,
            algorithm,
            constraints: Vec::new(),
            scenarios: Vec::new(),
            seed: None,
        }
    }

    pub fn with_constraint(mut self, constraint: OptimizationConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_scenario(mut self, scenario: ScenarioParameters) -> Self {
        self.scenarios.push(scenario);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

pub(crate) fn rng_for(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Entry point of the engine. Holds only read-only state, so one instance can
/// serve concurrent callers.
pub struct OptimizationService {
    registry: SolverRegistry,
    scenario_engine: ScenarioEngine,
    settings: Settings,
    cost_analyzer: Box<dyn CostAnalyzer>,
}

impl OptimizationService {
    pub fn new(cost_analyzer: impl CostAnalyzer + 'static) -> Self {
        let settings = Settings::default();
        Self {
            registry: SolverRegistry::new(&settings),
            scenario_engine: ScenarioEngine::new(),
            settings,
            cost_analyzer: Box::new(cost_analyzer),
        }
    }

    pub fn with_settings(cost_analyzer: impl CostAnalyzer + 'static, settings: Settings) -> Result<Self, OptimizerError> {
        settings.validate()?;
        Ok(Self {
            registry: SolverRegistry::new(&settings),
            scenario_engine: ScenarioEngine::new(),
            settings,
            cost_analyzer: Box::new(cost_analyzer),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn scenario_engine(&self) -> &ScenarioEngine {
        &self.scenario_engine
    }

    /// Draw `count` scenarios, reproducibly when a seed is given
    pub fn generate_scenarios(&self, scenario_type: ScenarioType, count: usize, seed: Option<u64>) -> Vec<ScenarioParameters> {
        self.scenario_engine.generate(scenario_type, count, &mut rng_for(seed))
    }

    /// Validate the method set and fetch estimates aligned with it
    pub(crate) fn cost_estimates(&self, request: &OptimizationRequest) -> Result<Vec<MethodCostEstimate>, OptimizerError> {
        if request.methods.is_empty() {
            return Err(OptimizerError::EmptyMethodSet);
        }
        let mut seen = HashSet::with_capacity(request.methods.len());
        for method in &request.methods {
            if !seen.insert(method.method_id.as_str()) {
                return Err(OptimizerError::DuplicateMethod(method.method_id.clone()));
            }
        }

        let analysis = self.cost_analyzer.analyze_application_costs(
            &request.methods,
            &request.field_conditions,
            &request.crop_requirements,
            &request.fertilizer_specification,
            &request.available_equipment,
        )?;
        join_costs(&request.methods, analysis)
    }

    /// Scenarios must already be validated by the caller
    pub(crate) fn build_problem(
        &self,
        request: &OptimizationRequest,
        method_costs: Vec<MethodCostEstimate>,
        scenarios: Vec<ScenarioParameters>,
    ) -> Result<OptimizationProblem, OptimizerError> {
        OptimizationProblem::build(
            request.methods.clone(),
            method_costs,
            request.objective,
            &request.constraints,
            scenarios,
        )
    }

    /// Run the requested algorithm and shape its outcome into a result
    pub(crate) fn solve(
        &self,
        problem: &OptimizationProblem,
        algorithm: AlgorithmKind,
        rng: &mut dyn RngCore,
        with_sensitivity: bool,
        started: Instant,
    ) -> OptimizationResult {
        let outcome = self.registry.run(algorithm, problem, rng);
        let success = outcome.convergence.success;

        let optimal_methods = if success {
            outcome
                .weights
                .iter()
                .zip(problem.methods.iter().zip(&problem.method_costs))
                .filter(|(w, _)| is_selected(**w))
                .map(|(&w, (method, estimate))| SelectedMethod {
                    method: method.clone(),
                    selection_weight: w,
                    cost: estimate.total_cost_per_acre,
                })
                .collect()
        } else {
            Vec::new()
        };

        let sensitivity_analysis = (success && with_sensitivity)
            .then(|| analyze_sensitivity(problem, &outcome.weights, &self.settings.cost_multipliers));

        OptimizationResult {
            optimal_methods,
            objective_value: outcome.objective_value,
            constraint_violations: outcome.constraint_violations,
            optimization_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            algorithm_used: algorithm,
            convergence_info: outcome.convergence,
            sensitivity_analysis,
        }
    }

    /// Select the best subset of application methods for the request.
    ///
    /// Invalid input is returned as an error. A solver that fails still yields
    /// `Ok`, with an infinite objective, no selected methods and the reason in
    /// `constraint_violations`.
    pub fn optimize_application_methods(&self, request: &OptimizationRequest) -> Result<OptimizationResult, OptimizerError> {
        let started = Instant::now();
        let method_costs = self.cost_estimates(request)?;
        self.scenario_engine.validate_set(&request.scenarios)?;
        let problem = self.build_problem(request, method_costs, request.scenarios.clone())?;
        debug!(
            methods = problem.num_methods(),
            rows = problem.constraints.len(),
            scenarios = problem.scenarios.len(),
            "optimization problem built"
        );

        let mut rng = rng_for(request.seed);
        let result = self.solve(&problem, request.algorithm, &mut rng, true, started);

        info!(
            algorithm = %request.algorithm,
            objective = %request.objective,
            success = result.is_success(),
            selected = result.optimal_methods.len(),
            objective_value = result.objective_value,
            elapsed_ms = result.optimization_time_ms,
            "optimization finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{CostAnalysis, TabulatedCostAnalyzer};
    use crate::model::ConstraintOperator;

    fn method(id: &str) -> ApplicationMethod {
        ApplicationMethod {
            method_id: id.to_string(),
            name: format!("{id} application"),
            application_rate: 150.0,
            efficiency: 0.85,
            cost_per_unit: 0.4,
            required_equipment: Default::default(),
        }
    }

    fn estimate(id: &str, cost: f64, revenue: f64) -> MethodCostEstimate {
        MethodCostEstimate {
            method_id: id.to_string(),
            total_cost_per_acre: cost,
            estimated_revenue_per_acre: revenue,
            efficiency_score: 0.8,
        }
    }

    fn service() -> OptimizationService {
        OptimizationService::new(TabulatedCostAnalyzer::new([
            estimate("broadcast", 50.0, 150.0),
            estimate("banded", 80.0, 100.0),
            estimate("injected", 120.0, 230.0),
        ]))
    }

    struct Failing;

    impl CostAnalyzer for Failing {
        fn analyze_application_costs(
            &self,
            _methods: &[ApplicationMethod],
            _field: &FieldConditions,
            _crop: &CropRequirements,
            _fertilizer: &FertilizerSpecification,
            _equipment: &[Equipment],
        ) -> Result<CostAnalysis, OptimizerError> {
            Err(OptimizerError::CostAnalysis("price feed unavailable".to_string()))
        }
    }

    #[test]
    fn test_service_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OptimizationService>();
    }

    #[test]
    fn test_lp_selects_cheapest_method() {
        let request = OptimizationRequest::new(
            vec![method("broadcast"), method("banded"), method("injected")],
            OptimizationObjective::MinimizeCost,
            AlgorithmKind::LinearProgramming,
        );

        let result = service().optimize_application_methods(&request).unwrap();

        assert!(result.is_success());
        assert_eq!(result.selected_ids(), vec!["broadcast"]);
        assert!((result.objective_value - 50.0).abs() < 1e-9);
        assert_eq!(result.optimal_methods[0].cost, 50.0);
        assert!(result.optimization_time_ms >= 0.0);
        assert!(result.sensitivity_analysis.is_some());
    }

    #[test]
    fn test_rejects_duplicate_and_empty_methods() {
        let svc = service();
        let empty = OptimizationRequest::new(Vec::new(), OptimizationObjective::MinimizeCost, AlgorithmKind::DynamicProgramming);
        assert_eq!(svc.optimize_application_methods(&empty).unwrap_err(), OptimizerError::EmptyMethodSet);

        let duplicated = OptimizationRequest::new(
            vec![method("broadcast"), method("broadcast")],
            OptimizationObjective::MinimizeCost,
            AlgorithmKind::DynamicProgramming,
        );
        assert_eq!(
            svc.optimize_application_methods(&duplicated).unwrap_err(),
            OptimizerError::DuplicateMethod("broadcast".to_string())
        );
    }

    #[test]
    fn test_cost_analysis_errors_propagate() {
        let svc = OptimizationService::new(Failing);
        let request =
            OptimizationRequest::new(vec![method("broadcast")], OptimizationObjective::MinimizeCost, AlgorithmKind::LinearProgramming);
        assert!(matches!(
            svc.optimize_application_methods(&request),
            Err(OptimizerError::CostAnalysis(_))
        ));
    }

    #[test]
    fn test_infeasible_request_is_a_failed_result() {
        let request = OptimizationRequest::new(
            vec![method("broadcast"), method("banded")],
            OptimizationObjective::MinimizeCost,
            AlgorithmKind::LinearProgramming,
        )
        .with_constraint(OptimizationConstraint::selection(ConstraintOperator::Ge, 3.0));

        let result = service().optimize_application_methods(&request).unwrap();

        assert!(!result.is_success());
        assert!(result.optimal_methods.is_empty());
        assert_eq!(result.objective_value, f64::INFINITY);
        assert!(!result.constraint_violations.is_empty());
        assert!(result.sensitivity_analysis.is_none());
    }

    #[test]
    fn test_invalid_scenario_is_rejected() {
        let request = OptimizationRequest::new(
            vec![method("broadcast")],
            OptimizationObjective::MinimizeCost,
            AlgorithmKind::DynamicProgramming,
        )
        .with_scenario(ScenarioParameters::new(ScenarioType::Price, 1.5, "impossible"));

        assert!(matches!(
            service().optimize_application_methods(&request),
            Err(OptimizerError::InvalidScenario { .. })
        ));
    }

    #[test]
    fn test_with_settings_validates() {
        let mut settings = Settings::default();
        settings.annealing.cooling_rate = 1.5;
        assert!(OptimizationService::with_settings(TabulatedCostAnalyzer::default(), settings).is_err());
    }

    #[test]
    fn test_seeded_requests_are_reproducible() {
        let svc = service();
        let request = OptimizationRequest::new(
            vec![method("broadcast"), method("banded"), method("injected")],
            OptimizationObjective::MaximizeProfit,
            AlgorithmKind::ParticleSwarm,
        )
        .with_seed(99);

        let first = svc.optimize_application_methods(&request).unwrap();
        let second = svc.optimize_application_methods(&request).unwrap();

        assert_eq!(first.selected_ids(), second.selected_ids());
        assert_eq!(first.objective_value, second.objective_value);
        assert_eq!(first.convergence_info, second.convergence_info);
    }
}
