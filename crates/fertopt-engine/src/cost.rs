use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::OptimizerError;
use crate::model::{
    ApplicationMethod, CropRequirements, Equipment, FertilizerSpecification, FieldConditions, MethodCostEstimate,
};

/// Output of the upstream cost-analysis collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub method_costs: Vec<MethodCostEstimate>,
}

/// Per-method economic estimation. Implemented outside this crate; the engine
/// treats the returned figures as opaque.
pub trait CostAnalyzer: Send + Sync {
    fn analyze_application_costs(
        &self,
        methods: &[ApplicationMethod],
        field: &FieldConditions,
        crop: &CropRequirements,
        fertilizer: &FertilizerSpecification,
        equipment: &[Equipment],
    ) -> Result<CostAnalysis, OptimizerError>;
}

/// Serves estimates computed ahead of time, keyed by method id
#[derive(Debug, Clone, Default)]
pub struct TabulatedCostAnalyzer {
    estimates: HashMap<String, MethodCostEstimate>,
}

impl TabulatedCostAnalyzer {
    pub fn new(estimates: impl IntoIterator<Item = MethodCostEstimate>) -> Self {
        Self {
            estimates: estimates.into_iter().map(|e| (e.method_id.clone(), e)).collect(),
        }
    }
}

impl CostAnalyzer for TabulatedCostAnalyzer {
    fn analyze_application_costs(
        &self,
        methods: &[ApplicationMethod],
        _field: &FieldConditions,
        _crop: &CropRequirements,
        _fertilizer: &FertilizerSpecification,
        _equipment: &[Equipment],
    ) -> Result<CostAnalysis, OptimizerError> {
        let method_costs = methods
            .iter()
            .map(|m| {
                self.estimates
                    .get(&m.method_id)
                    .cloned()
                    .ok_or_else(|| OptimizerError::MissingCostEstimate(m.method_id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CostAnalysis { method_costs })
    }
}

/// Align estimates with `methods` by id. The result has the same length and
/// order as `methods` regardless of the order the estimates arrived in.
pub fn join_costs(
    methods: &[ApplicationMethod],
    analysis: CostAnalysis,
) -> Result<Vec<MethodCostEstimate>, OptimizerError> {
    if analysis.method_costs.len() != methods.len() {
        return Err(OptimizerError::LengthMismatch {
            what: "method cost estimates",
            expected: methods.len(),
            found: analysis.method_costs.len(),
        });
    }

    let mut by_id: HashMap<String, MethodCostEstimate> = HashMap::with_capacity(methods.len());
    for estimate in analysis.method_costs {
        let id = estimate.method_id.clone();
        if by_id.insert(id.clone(), estimate).is_some() {
            return Err(OptimizerError::DuplicateMethod(id));
        }
    }

    let mut joined = Vec::with_capacity(methods.len());
    for method in methods {
        let estimate = by_id
            .remove(&method.method_id)
            .ok_or_else(|| OptimizerError::MissingCostEstimate(method.method_id.clone()))?;
        joined.push(estimate);
    }
    if let Some(extra) = by_id.into_keys().next() {
        return Err(OptimizerError::UnknownCostEstimate(extra));
    }
    Ok(joined)
}
