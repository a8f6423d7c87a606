use crate::error::LpError;

/// A linear program over non-negative variables with optional upper bounds
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct LinearProgram {
    /// Variable names
    pub variables: Vec<String>,
    /// Objective function
    pub objective: Objective,
    /// Row constraints
    pub constraints: Vec<Constraint>,
    /// Per-variable upper bound; `None` means unbounded above
    pub upper_bounds: Vec<Option<f64>>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Label used in violation reports
    pub name: String,
    pub coefficients: Vec<f64>,
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl ConstraintOp {
    /// The operator obtained by multiplying both sides by -1
    pub fn mirrored(self) -> Self {
        match self {
            ConstraintOp::Le => ConstraintOp::Ge,
            ConstraintOp::Ge => ConstraintOp::Le,
            ConstraintOp::Eq => ConstraintOp::Eq,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ConstraintOp::Le => "<=",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Eq => "==",
        }
    }
}

impl Constraint {
    /// Left-hand side value for a candidate point
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(values)
            .map(|(coef, value)| coef * value)
            .sum()
    }
}

impl LinearProgram {
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: Objective {
                coefficients: vec![0.0; n],
                minimize: true,
            },
            constraints: Vec::new(),
            upper_bounds: vec![None; n],
        }
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, minimize: bool) {
        self.objective = Objective { coefficients, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    /// Add `lower <= a.x <= upper`, emitting one row per finite side
    /// (a single equality row when both sides coincide).
    pub fn add_range(&mut self, name: impl Into<String>, coefficients: Vec<f64>, lower: f64, upper: f64) {
        let name = name.into();
        if lower.is_finite() && upper.is_finite() && lower == upper {
            self.add_constraint(name, coefficients, ConstraintOp::Eq, lower);
            return;
        }
        if lower.is_finite() {
            self.add_constraint(format!("{name} (min)"), coefficients.clone(), ConstraintOp::Ge, lower);
        }
        if upper.is_finite() {
            self.add_constraint(format!("{name} (max)"), coefficients, ConstraintOp::Le, upper);
        }
    }

    pub fn set_upper_bound(&mut self, variable: usize, bound: f64) {
        if let Some(slot) = self.upper_bounds.get_mut(variable) {
            *slot = Some(bound);
        }
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Objective value at a candidate point
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.objective
            .coefficients
            .iter()
            .zip(values)
            .map(|(coef, value)| coef * value)
            .sum()
    }

    /// Check dimensions and reject NaN/infinite data before building a tableau
    pub fn validate(&self) -> Result<(), LpError> {
        let n = self.num_variables();
        if self.objective.coefficients.len() != n {
            return Err(LpError::DimensionMismatch {
                what: "objective".to_string(),
                expected: n,
                found: self.objective.coefficients.len(),
            });
        }
        if self.upper_bounds.len() != n {
            return Err(LpError::DimensionMismatch {
                what: "upper bounds".to_string(),
                expected: n,
                found: self.upper_bounds.len(),
            });
        }
        if self.objective.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(LpError::NonFinite("objective".to_string()));
        }
        for c in &self.constraints {
            if c.coefficients.len() != n {
                return Err(LpError::DimensionMismatch {
                    what: c.name.clone(),
                    expected: n,
                    found: c.coefficients.len(),
                });
            }
            if !c.rhs.is_finite() || c.coefficients.iter().any(|v| !v.is_finite()) {
                return Err(LpError::NonFinite(c.name.clone()));
            }
        }
        for (j, bound) in self.upper_bounds.iter().enumerate() {
            if let Some(ub) = bound {
                if !ub.is_finite() || *ub < 0.0 {
                    return Err(LpError::InvalidBound {
                        variable: self.variables[j].clone(),
                        bound: *ub,
                    });
                }
            }
        }
        Ok(())
    }
}
