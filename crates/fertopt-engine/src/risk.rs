use std::fmt;

use serde::{Deserialize, Serialize};

/// Percentage change above which a parameter is high risk
pub const HIGH_RISK_CHANGE_PERCENT: f64 = 20.0;
/// Percentage change above which a parameter is medium risk
pub const MEDIUM_RISK_CHANGE_PERCENT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRisk {
    pub parameter: String,
    pub max_change_percent: f64,
    pub risk_level: RiskLevel,
}

impl ParameterRisk {
    /// Classify by the largest absolute change against the generic thresholds
    pub fn from_changes(parameter: impl Into<String>, changes: &[f64]) -> Self {
        let max_change_percent = changes.iter().map(|c| c.abs()).fold(0.0, f64::max);
        Self {
            parameter: parameter.into(),
            max_change_percent,
            risk_level: classify_change(max_change_percent),
        }
    }

    /// A parameter already rated by its own thresholds
    pub fn classified(parameter: impl Into<String>, change_percent: f64, risk_level: RiskLevel) -> Self {
        Self {
            parameter: parameter.into(),
            max_change_percent: change_percent.abs(),
            risk_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: RiskLevel,
    pub parameters: Vec<ParameterRisk>,
    pub high_risk_parameters: Vec<String>,
    pub mitigation_strategies: Vec<String>,
}

const MITIGATION_STRATEGIES: [&str; 3] = [
    "Hedge input and crop prices with forward contracts or pre-purchase agreements",
    "Monitor input markets and weather forecasts ahead of each application window",
    "Keep a contingency plan with an alternative application method ready",
];

pub fn classify_change(change_percent: f64) -> RiskLevel {
    let magnitude = change_percent.abs();
    if magnitude > HIGH_RISK_CHANGE_PERCENT {
        RiskLevel::High
    } else if magnitude > MEDIUM_RISK_CHANGE_PERCENT {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Roll rated parameters up into an overall level, with mitigation guidance
/// when any of them is high risk
pub fn assess_risk(parameters: impl IntoIterator<Item = ParameterRisk>) -> RiskAssessment {
    let parameters: Vec<ParameterRisk> = parameters.into_iter().collect();

    let overall_risk = parameters
        .iter()
        .map(|p| p.risk_level)
        .max()
        .unwrap_or(RiskLevel::Low);
    let high_risk_parameters: Vec<String> = parameters
        .iter()
        .filter(|p| p.risk_level == RiskLevel::High)
        .map(|p| p.parameter.clone())
        .collect();
    let mitigation_strategies = if high_risk_parameters.is_empty() {
        Vec::new()
    } else {
        MITIGATION_STRATEGIES.iter().map(|s| s.to_string()).collect()
    };

    RiskAssessment {
        overall_risk,
        parameters,
        high_risk_parameters,
        mitigation_strategies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_change_thresholds() {
        assert_eq!(classify_change(20.0), RiskLevel::Medium);
        assert_eq!(classify_change(-20.5), RiskLevel::High);
        assert_eq!(classify_change(10.0), RiskLevel::Low);
        assert_eq!(classify_change(10.01), RiskLevel::Medium);
    }

    #[test]
    fn test_overall_takes_the_worst_parameter() {
        let assessment = assess_risk([
            ParameterRisk::from_changes("cost", &[0.0, -5.0, 8.0]),
            ParameterRisk::from_changes("price", &[15.0]),
        ]);

        assert_eq!(assessment.overall_risk, RiskLevel::Medium);
        assert_eq!(assessment.parameters[0].risk_level, RiskLevel::Low);
        assert!(assessment.high_risk_parameters.is_empty());
        assert!(assessment.mitigation_strategies.is_empty());
    }

    #[test]
    fn test_high_risk_attaches_mitigation() {
        let assessment = assess_risk([ParameterRisk::from_changes("cost", &[-25.0, 0.0, 25.0])]);

        assert_eq!(assessment.overall_risk, RiskLevel::High);
        assert_eq!(assessment.parameters[0].max_change_percent, 25.0);
        assert_eq!(assessment.high_risk_parameters, vec!["cost".to_string()]);
        assert_eq!(assessment.mitigation_strategies.len(), 3);
    }

    #[test]
    fn test_classified_level_is_kept() {
        // 25% would be high on the generic scale
        let assessment = assess_risk([ParameterRisk::classified("dry spell", -25.0, RiskLevel::Medium)]);

        assert_eq!(assessment.overall_risk, RiskLevel::Medium);
        assert_eq!(assessment.parameters[0].max_change_percent, 25.0);
        assert!(assessment.high_risk_parameters.is_empty());
    }

    #[test]
    fn test_empty_is_low() {
        let assessment = assess_risk(Vec::new());
        assert_eq!(assessment.overall_risk, RiskLevel::Low);
    }
}
