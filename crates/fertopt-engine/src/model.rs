use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::algorithms::AlgorithmKind;
use crate::error::OptimizerError;
use crate::sensitivity::SensitivityAnalysis;

/// A candidate fertilizer placement technique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationMethod {
    pub method_id: String,
    pub name: String,
    /// Product applied per acre
    pub application_rate: f64,
    /// Nutrient use efficiency in [0, 1]
    pub efficiency: f64,
    pub cost_per_unit: f64,
    #[serde(default)]
    pub required_equipment: BTreeSet<String>,
}

/// Economic estimate for one method, produced by the cost-analysis collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCostEstimate {
    pub method_id: String,
    pub total_cost_per_acre: f64,
    pub estimated_revenue_per_acre: f64,
    pub efficiency_score: f64,
}

impl MethodCostEstimate {
    pub fn profit(&self) -> f64 {
        self.estimated_revenue_per_acre - self.total_cost_per_acre
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConditions {
    pub field_size_acres: f64,
    #[serde(default)]
    pub soil_type: String,
    #[serde(default)]
    pub slope_percent: f64,
    #[serde(default)]
    pub drainage_class: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CropRequirements {
    pub crop_type: String,
    pub expected_yield_per_acre: f64,
    #[serde(default)]
    pub crop_price_per_unit: f64,
    #[serde(default)]
    pub nitrogen_need_lbs_per_acre: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FertilizerSpecification {
    pub fertilizer_type: String,
    pub price_per_unit: f64,
    #[serde(default)]
    pub nutrient_content_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub equipment_id: String,
    pub equipment_type: String,
    #[serde(default)]
    pub capacity_acres_per_hour: f64,
}

/// The scalar quantity being optimized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationObjective {
    MinimizeCost,
    MaximizeProfit,
    MaximizeRoi,
    MinimizeRisk,
    MaximizeEfficiency,
    BalancedOptimization,
}

impl OptimizationObjective {
    pub fn as_str(self) -> &'static str {
        match self {
            OptimizationObjective::MinimizeCost => "minimize_cost",
            OptimizationObjective::MaximizeProfit => "maximize_profit",
            OptimizationObjective::MaximizeRoi => "maximize_roi",
            OptimizationObjective::MinimizeRisk => "minimize_risk",
            OptimizationObjective::MaximizeEfficiency => "maximize_efficiency",
            OptimizationObjective::BalancedOptimization => "balanced_optimization",
        }
    }
}

impl fmt::Display for OptimizationObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationObjective {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minimize_cost" => Ok(OptimizationObjective::MinimizeCost),
            "maximize_profit" => Ok(OptimizationObjective::MaximizeProfit),
            "maximize_roi" => Ok(OptimizationObjective::MaximizeRoi),
            "minimize_risk" => Ok(OptimizationObjective::MinimizeRisk),
            "maximize_efficiency" => Ok(OptimizationObjective::MaximizeEfficiency),
            "balanced_optimization" | "balanced" => Ok(OptimizationObjective::BalancedOptimization),
            other => Err(OptimizerError::UnknownObjective(other.to_string())),
        }
    }
}

/// Supported constraint families. Only the aggregate selection count is modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    #[serde(alias = "aggregate")]
    Selection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintOperator {
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
}

impl ConstraintOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            ConstraintOperator::Le => "<=",
            ConstraintOperator::Ge => ">=",
            ConstraintOperator::Eq => "==",
        }
    }
}

/// A caller-supplied linear constraint on the selection vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationConstraint {
    pub constraint_type: ConstraintKind,
    pub variable: String,
    pub operator: ConstraintOperator,
    pub value: f64,
    #[serde(default)]
    pub description: String,
}

impl OptimizationConstraint {
    /// Constraint on the number of selected methods
    pub fn selection(operator: ConstraintOperator, value: f64) -> Self {
        Self {
            constraint_type: ConstraintKind::Selection,
            variable: "selection".to_string(),
            operator,
            value,
            description: format!("selected methods {} {}", operator.symbol(), value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedMethod {
    pub method: ApplicationMethod,
    pub selection_weight: f64,
    /// Total cost per acre of this method
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceInfo {
    pub success: bool,
    /// Whether the returned selection satisfies every constraint row
    pub feasible: bool,
    pub iterations: usize,
    /// Objective evaluations (or pivots for the LP solver)
    pub evaluations: usize,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_temperature: Option<f64>,
}

impl ConvergenceInfo {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            feasible: false,
            iterations: 0,
            evaluations: 0,
            message: message.into(),
            final_temperature: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub optimal_methods: Vec<SelectedMethod>,
    /// `+inf` when the solver failed; serialized as `null`
    #[serde(with = "non_finite_as_null")]
    pub objective_value: f64,
    pub constraint_violations: Vec<String>,
    pub optimization_time_ms: f64,
    pub algorithm_used: AlgorithmKind,
    pub convergence_info: ConvergenceInfo,
    #[serde(default)]
    pub sensitivity_analysis: Option<SensitivityAnalysis>,
}

impl OptimizationResult {
    pub fn is_success(&self) -> bool {
        self.convergence_info.success
    }

    pub fn selected_ids(&self) -> Vec<&str> {
        self.optimal_methods
            .iter()
            .map(|m| m.method.method_id.as_str())
            .collect()
    }
}

/// JSON has no representation for infinities; failed results carry `+inf`
mod non_finite_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_from_str() {
        assert_eq!("MAXIMIZE_PROFIT".parse::<OptimizationObjective>(), Ok(OptimizationObjective::MaximizeProfit));
        assert_eq!("balanced".parse::<OptimizationObjective>(), Ok(OptimizationObjective::BalancedOptimization));
        let err = "minimize_regret".parse::<OptimizationObjective>().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_constraint_json_shape() {
        let json = r#"{"constraint_type":"aggregate","variable":"total","operator":"<=","value":1.0}"#;
        let constraint: OptimizationConstraint = serde_json::from_str(json).unwrap();
        assert_eq!(constraint.constraint_type, ConstraintKind::Selection);
        assert_eq!(constraint.operator, ConstraintOperator::Le);
        assert!(constraint.description.is_empty());

        let unsupported = r#"{"constraint_type":"budget","variable":"x","operator":"<=","value":1.0}"#;
        assert!(serde_json::from_str::<OptimizationConstraint>(unsupported).is_err());
    }
}
