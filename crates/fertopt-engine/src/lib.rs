pub mod algorithms;
pub mod constraints;
pub mod cost;
mod error;
mod model;
pub mod objective;
pub mod problem;
pub mod risk;
mod robustness;
pub mod scenario;
pub mod sensitivity;
mod service;
mod settings;

pub use algorithms::{Algorithm, AlgorithmKind, SolverFailure, SolverOutcome, SolverRegistry, create_algorithm};
pub use cost::{CostAnalysis, CostAnalyzer, TabulatedCostAnalyzer, join_costs};
pub use error::OptimizerError;
pub use model::{
    ApplicationMethod, ConstraintKind, ConstraintOperator, ConvergenceInfo, CropRequirements, Equipment,
    FertilizerSpecification, FieldConditions, MethodCostEstimate, OptimizationConstraint, OptimizationObjective,
    OptimizationResult, SelectedMethod,
};
pub use problem::OptimizationProblem;
pub use risk::{RiskAssessment, RiskLevel};
pub use robustness::RobustnessReport;
pub use scenario::{ScenarioEngine, ScenarioParameters, ScenarioType};
pub use sensitivity::SensitivityAnalysis;
pub use service::{OptimizationRequest, OptimizationService};
pub use settings::{
    AnnealingSettings, GeneticSettings, LinearProgrammingSettings, MonteCarloSettings, Settings, SwarmSettings,
};
