use fertopt_engine::{
    AlgorithmKind, ApplicationMethod, ConstraintOperator, CostAnalysis, CostAnalyzer, CropRequirements, Equipment,
    FertilizerSpecification, FieldConditions, MethodCostEstimate, OptimizationConstraint, OptimizationObjective,
    OptimizationRequest, OptimizationResult, OptimizationService, OptimizerError, ScenarioType, TabulatedCostAnalyzer,
};

fn method(id: &str) -> ApplicationMethod {
    ApplicationMethod {
        method_id: id.to_string(),
        name: format!("{id} application"),
        application_rate: 140.0,
        efficiency: 0.75,
        cost_per_unit: 0.45,
        required_equipment: ["spreader".to_string()].into_iter().collect(),
    }
}

fn estimate(id: &str, cost: f64, revenue: f64) -> MethodCostEstimate {
    MethodCostEstimate {
        method_id: id.to_string(),
        total_cost_per_acre: cost,
        estimated_revenue_per_acre: revenue,
        efficiency_score: 0.7,
    }
}

fn service_for(estimates: &[MethodCostEstimate]) -> OptimizationService {
    OptimizationService::new(TabulatedCostAnalyzer::new(estimates.iter().cloned()))
}

fn request(ids: &[&str], objective: OptimizationObjective, algorithm: AlgorithmKind) -> OptimizationRequest {
    let mut request = OptimizationRequest::new(ids.iter().map(|id| method(id)).collect(), objective, algorithm);
    request.field_conditions = FieldConditions {
        field_size_acres: 160.0,
        soil_type: "silt loam".to_string(),
        slope_percent: 2.0,
        drainage_class: "well drained".to_string(),
    };
    request.crop_requirements = CropRequirements {
        crop_type: "corn".to_string(),
        expected_yield_per_acre: 180.0,
        crop_price_per_unit: 4.5,
        nitrogen_need_lbs_per_acre: 160.0,
    };
    request.seed = Some(42);
    request
}

/// Serves estimates in the reverse of the order the methods were given
struct ReversingAnalyzer(TabulatedCostAnalyzer);

impl CostAnalyzer for ReversingAnalyzer {
    fn analyze_application_costs(
        &self,
        methods: &[ApplicationMethod],
        field: &FieldConditions,
        crop: &CropRequirements,
        fertilizer: &FertilizerSpecification,
        equipment: &[Equipment],
    ) -> Result<CostAnalysis, OptimizerError> {
        let mut analysis = self.0.analyze_application_costs(methods, field, crop, fertilizer, equipment)?;
        analysis.method_costs.reverse();
        Ok(analysis)
    }
}

#[test]
fn test_every_algorithm_selects_a_single_method() {
    let service = service_for(&[estimate("only", 35.0, 90.0)]);
    for algorithm in AlgorithmKind::ALL {
        let result = service
            .optimize_application_methods(&request(&["only"], OptimizationObjective::MinimizeCost, algorithm))
            .unwrap();

        assert!(result.is_success(), "{algorithm}: {:?}", result.convergence_info);
        assert_eq!(result.selected_ids(), vec!["only"], "{algorithm}");
        assert!((result.objective_value - 35.0).abs() < 1e-9, "{algorithm}");
        assert_eq!(result.algorithm_used, algorithm);
    }
}

#[test]
fn test_profit_example_selects_a_under_single_selection() {
    let service = service_for(&[estimate("A", 50.0, 150.0), estimate("B", 80.0, 100.0)]);
    for algorithm in AlgorithmKind::ALL {
        let req = request(&["A", "B"], OptimizationObjective::MaximizeProfit, algorithm)
            .with_constraint(OptimizationConstraint::selection(ConstraintOperator::Le, 1.0));

        let result = service.optimize_application_methods(&req).unwrap();

        assert_eq!(result.selected_ids(), vec!["A"], "{algorithm}");
        assert!((result.objective_value + 100.0).abs() < 1e-6, "{algorithm}");
        assert!(result.convergence_info.feasible, "{algorithm}");
        assert!(result.constraint_violations.is_empty(), "{algorithm}");
    }
}

#[test]
fn test_linear_and_dynamic_agree_on_cardinality_problems() {
    let estimates = [
        estimate("broadcast", 42.0, 110.0),
        estimate("banded", 58.0, 150.0),
        estimate("injected", 95.0, 160.0),
        estimate("fertigation", 37.0, 30.0),
        estimate("foliar", 70.0, 60.0),
    ];
    let ids: Vec<&str> = estimates.iter().map(|e| e.method_id.as_str()).collect();
    let service = service_for(&estimates);

    let cases = [
        (OptimizationObjective::MinimizeCost, Some(OptimizationConstraint::selection(ConstraintOperator::Eq, 2.0))),
        (OptimizationObjective::MaximizeProfit, None),
        (OptimizationObjective::MaximizeProfit, Some(OptimizationConstraint::selection(ConstraintOperator::Le, 2.0))),
        (OptimizationObjective::MinimizeCost, Some(OptimizationConstraint::selection(ConstraintOperator::Ge, 3.0))),
    ];

    for (objective, constraint) in cases {
        let run = |algorithm| {
            let mut req = request(&ids, objective, algorithm);
            req.constraints.extend(constraint.clone());
            service.optimize_application_methods(&req).unwrap()
        };
        let lp = run(AlgorithmKind::LinearProgramming);
        let dp = run(AlgorithmKind::DynamicProgramming);

        assert!(lp.is_success() && dp.is_success());
        assert!(
            (lp.objective_value - dp.objective_value).abs() < 1e-6,
            "{objective}: lp {} dp {}",
            lp.objective_value,
            dp.objective_value
        );
        assert_eq!(lp.selected_ids(), dp.selected_ids(), "{objective}");
    }
}

#[test]
fn test_cost_sensitivity_grows_with_perturbation() {
    let service = service_for(&[estimate("only", 80.0, 200.0)]);
    let result = service
        .optimize_application_methods(&request(&["only"], OptimizationObjective::MinimizeCost, AlgorithmKind::DynamicProgramming))
        .unwrap();

    let sensitivity = result.sensitivity_analysis.unwrap();
    let changes: Vec<(f64, f64)> = sensitivity
        .cost_sensitivity
        .iter()
        .map(|p| (p.cost_multiplier, p.change_percent))
        .collect();
    assert_eq!(changes.len(), 5);
    for (multiplier, change) in changes {
        assert!((change - (multiplier - 1.0) * 100.0).abs() < 1e-9);
    }
}

#[test]
fn test_result_json_round_trip() {
    let service = service_for(&[estimate("A", 50.0, 150.0), estimate("B", 80.0, 100.0), estimate("C", 61.5, 140.25)]);
    let result = service
        .optimize_application_methods(&request(&["A", "B", "C"], OptimizationObjective::MaximizeRoi, AlgorithmKind::LinearProgramming))
        .unwrap();

    let json = serde_json::to_string(&result).unwrap();
    let back: OptimizationResult = serde_json::from_str(&json).unwrap();

    assert_eq!(back.selected_ids(), result.selected_ids());
    assert!((back.objective_value - result.objective_value).abs() < 1e-9);
    assert!((back.optimization_time_ms - result.optimization_time_ms).abs() < 1e-9);
    for (a, b) in back.optimal_methods.iter().zip(&result.optimal_methods) {
        assert!((a.selection_weight - b.selection_weight).abs() < 1e-9);
        assert_eq!(a.method, b.method);
    }
    assert_eq!(back.convergence_info, result.convergence_info);
    assert_eq!(back.algorithm_used, result.algorithm_used);
    assert_eq!(back.sensitivity_analysis.is_some(), result.sensitivity_analysis.is_some());
}

#[test]
fn test_failed_result_shape_and_json() {
    let service = service_for(&[estimate("A", 50.0, 150.0), estimate("B", 80.0, 100.0)]);
    let req = request(&["A", "B"], OptimizationObjective::MinimizeCost, AlgorithmKind::LinearProgramming)
        .with_constraint(OptimizationConstraint::selection(ConstraintOperator::Ge, 5.0));

    let result = service.optimize_application_methods(&req).unwrap();

    assert!(!result.is_success());
    assert!(!result.convergence_info.feasible);
    assert!(result.optimal_methods.is_empty());
    assert_eq!(result.objective_value, f64::INFINITY);
    assert!(!result.constraint_violations.is_empty());
    assert!(result.sensitivity_analysis.is_none());

    let value = serde_json::to_value(&result).unwrap();
    assert!(value["objective_value"].is_null());
    let back: OptimizationResult = serde_json::from_value(value).unwrap();
    assert_eq!(back.objective_value, f64::INFINITY);
}

#[test]
fn test_unknown_selectors_are_configuration_errors() {
    let algorithm = "branch_and_bound".parse::<AlgorithmKind>().unwrap_err();
    assert_eq!(algorithm, OptimizerError::UnknownAlgorithm("branch_and_bound".to_string()));
    assert!(algorithm.is_configuration());

    assert!("minimize_carbon".parse::<OptimizationObjective>().unwrap_err().is_configuration());
    assert!("drought".parse::<ScenarioType>().unwrap_err().is_configuration());

    let json = r#"{"methods": [], "objective": "minimize_cost", "algorithm": "tabu_search"}"#;
    assert!(serde_json::from_str::<OptimizationRequest>(json).is_err());
}

#[test]
fn test_request_from_json() {
    let json = r#"{
        "methods": [
            {"method_id": "A", "name": "broadcast", "application_rate": 150.0, "efficiency": 0.7, "cost_per_unit": 0.5},
            {"method_id": "B", "name": "banded", "application_rate": 120.0, "efficiency": 0.85, "cost_per_unit": 0.6}
        ],
        "objective": "maximize_profit",
        "algorithm": "monte_carlo",
        "constraints": [{"constraint_type": "selection", "variable": "total", "operator": "<=", "value": 1.0}],
        "seed": 7
    }"#;
    let req: OptimizationRequest = serde_json::from_str(json).unwrap();
    assert_eq!(req.algorithm, AlgorithmKind::StochasticOptimization);

    let service = service_for(&[estimate("A", 50.0, 150.0), estimate("B", 80.0, 100.0)]);
    let result = service.optimize_application_methods(&req).unwrap();
    assert_eq!(result.selected_ids(), vec!["A"]);
}

#[test]
fn test_estimates_are_joined_by_id() {
    let estimates = [estimate("A", 90.0, 100.0), estimate("B", 30.0, 100.0), estimate("C", 60.0, 100.0)];
    let service = OptimizationService::new(ReversingAnalyzer(TabulatedCostAnalyzer::new(estimates.iter().cloned())));

    let result = service
        .optimize_application_methods(&request(&["A", "B", "C"], OptimizationObjective::MinimizeCost, AlgorithmKind::LinearProgramming))
        .unwrap();

    assert_eq!(result.selected_ids(), vec!["B"]);
    assert_eq!(result.optimal_methods[0].cost, 30.0);
}

#[test]
fn test_missing_estimate_is_an_input_error() {
    let service = service_for(&[estimate("A", 50.0, 150.0)]);
    let err = service
        .optimize_application_methods(&request(&["A", "Z"], OptimizationObjective::MinimizeCost, AlgorithmKind::DynamicProgramming))
        .unwrap_err();
    assert_eq!(err, OptimizerError::MissingCostEstimate("Z".to_string()));
    assert!(!err.is_configuration());
}

#[test]
fn test_weather_sweep_is_reproducible() {
    let service = service_for(&[estimate("A", 45.0, 150.0), estimate("B", 65.0, 100.0), estimate("C", 80.0, 120.0)]);
    let req = request(&["A", "B", "C"], OptimizationObjective::MinimizeCost, AlgorithmKind::StochasticOptimization);

    let first = service.robustness_sweep(&req, ScenarioType::Weather, 10).unwrap();
    let second = service.robustness_sweep(&req, ScenarioType::Weather, 10).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.succeeded, 10);
    assert_eq!(first.selection_frequency["A"], 1.0);
    let (min, max) = (first.min_objective.unwrap(), first.max_objective.unwrap());
    assert!(min >= 45.0 * 0.7 - 1e-9 && max <= 45.0 * 1.3 + 1e-9);
}
