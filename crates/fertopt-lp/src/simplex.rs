use std::collections::HashMap;

use crate::error::LpError;
use crate::problem::{Constraint, ConstraintOp, LinearProgram};
use crate::solution::{ConstraintViolation, Solution, SolutionStatus};

/// Two-phase simplex solver for bounded linear programs
#[derive(Debug, Clone)]
pub struct Solver {
    /// Pivot budget shared by both phases
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Solve the program. Malformed input is an error; infeasibility is reported
    /// through the returned solution together with the constraints a best-effort
    /// point violates.
    pub fn solve(&self, problem: &LinearProgram) -> Result<Solution, LpError> {
        problem.validate()?;

        let rows = standard_rows(problem);
        let mut tableau = Tableau::build(&rows, problem);
        let mut iterations = 0;

        if tableau.artificial > 0 && !self.phase1(&mut tableau, &mut iterations) {
            return Ok(self.explain_infeasibility(problem, iterations));
        }

        let status = match self.phase2(&mut tableau, &mut iterations) {
            PhaseOutcome::Optimal => SolutionStatus::Optimal,
            PhaseOutcome::Unbounded => return Ok(Solution::unbounded(iterations)),
            PhaseOutcome::IterationLimit => SolutionStatus::IterationLimit,
        };

        let values = tableau.structural_values();
        Ok(Solution {
            status,
            objective_value: problem.evaluate(&values),
            values,
            iterations,
            violations: Vec::new(),
        })
    }

    /// Drive the artificial variables to zero. Returns false when that is impossible.
    fn phase1(&self, tableau: &mut Tableau, iterations: &mut usize) -> bool {
        let art_start = tableau.structural + tableau.slack;
        let original = tableau.objective_row().to_vec();

        // Maximize -sum(artificials), then price out the artificials already in the basis
        let width = tableau.width;
        for j in 0..width {
            let value = if j >= art_start && j < width - 1 { -1.0 } else { 0.0 };
            tableau.set_objective(j, value);
        }
        for i in 0..tableau.height {
            if tableau.basis[i] >= art_start {
                for j in 0..width {
                    let v = tableau.objective(j) + tableau.at(i, j);
                    tableau.set_objective(j, v);
                }
            }
        }

        while *iterations < self.max_iterations {
            let Some(col) = tableau.entering(width - 1, self.tolerance) else {
                break;
            };
            let Some(row) = tableau.leaving(col, self.tolerance) else {
                return false;
            };
            tableau.pivot(row, col);
            *iterations += 1;
        }

        let stuck = (0..tableau.height)
            .any(|i| tableau.basis[i] >= art_start && tableau.rhs(i).abs() > self.tolerance.sqrt());
        if stuck {
            return false;
        }

        self.expel_artificials(tableau);

        // Restore the real objective expressed in terms of the current basis
        for (j, value) in original.into_iter().enumerate() {
            tableau.set_objective(j, value);
        }
        for i in 0..tableau.height {
            let basic = tableau.basis[i];
            let ratio = tableau.objective(basic);
            if ratio.abs() > self.tolerance {
                for j in 0..width {
                    let v = tableau.objective(j) - ratio * tableau.at(i, j);
                    tableau.set_objective(j, v);
                }
            }
        }

        true
    }

    /// Pivot zero-level artificials out of the basis so phase 2 cannot move them.
    /// Rows whose non-artificial part is all zero are redundant and left alone.
    fn expel_artificials(&self, tableau: &mut Tableau) {
        let art_start = tableau.structural + tableau.slack;
        for i in 0..tableau.height {
            if tableau.basis[i] < art_start {
                continue;
            }
            if let Some(col) = (0..art_start).find(|&j| tableau.at(i, j).abs() > self.tolerance) {
                tableau.pivot(i, col);
            }
        }
    }

    fn phase2(&self, tableau: &mut Tableau, iterations: &mut usize) -> PhaseOutcome {
        let art_start = tableau.structural + tableau.slack;

        while *iterations < self.max_iterations {
            let Some(col) = tableau.entering(art_start, self.tolerance) else {
                return PhaseOutcome::Optimal;
            };
            let Some(row) = tableau.leaving(col, self.tolerance) else {
                return PhaseOutcome::Unbounded;
            };
            tableau.pivot(row, col);
            *iterations += 1;
        }
        PhaseOutcome::IterationLimit
    }

    /// Re-solve keeping only the upper-limit and equality rows, then report which
    /// of the original rows the relaxed optimum breaks (worst first).
    fn explain_infeasibility(&self, problem: &LinearProgram, iterations: usize) -> Solution {
        let mut relaxed = problem.clone();
        relaxed.constraints.retain(|c| c.op != ConstraintOp::Ge);

        let rows = standard_rows(&relaxed);
        let mut tableau = Tableau::build(&rows, &relaxed);
        let mut relaxed_iterations = 0;
        let feasible = tableau.artificial == 0 || self.phase1(&mut tableau, &mut relaxed_iterations);
        let outcome = if feasible {
            Some(self.phase2(&mut tableau, &mut relaxed_iterations))
        } else {
            None
        };

        let total = iterations + relaxed_iterations;
        match outcome {
            Some(PhaseOutcome::Optimal) | Some(PhaseOutcome::IterationLimit) => {
                let values = tableau.structural_values();
                let violations = self.find_violations(problem, &values);
                Solution {
                    status: SolutionStatus::Infeasible,
                    objective_value: problem.evaluate(&values),
                    values,
                    iterations: total,
                    violations,
                }
            }
            _ => Solution::infeasible(self.analyze_conflicts(problem), total),
        }
    }

    /// Rows the given point fails, sorted by violation amount (worst first)
    pub fn find_violations(&self, problem: &LinearProgram, values: &[f64]) -> Vec<ConstraintViolation> {
        let mut violations: Vec<ConstraintViolation> = problem
            .constraints
            .iter()
            .filter_map(|c| self.violation(c, values))
            .collect();

        for (j, bound) in problem.upper_bounds.iter().enumerate() {
            if let (Some(ub), Some(&value)) = (bound, values.get(j)) {
                if value > ub + self.tolerance {
                    violations.push(ConstraintViolation {
                        constraint: format!("{} upper bound", problem.variables[j]),
                        required: *ub,
                        actual: value,
                        violation_amount: value - ub,
                        description: format!("{} exceeds its bound of {:.2}", problem.variables[j], ub),
                    });
                }
            }
        }

        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));
        violations
    }

    fn violation(&self, c: &Constraint, values: &[f64]) -> Option<ConstraintViolation> {
        let lhs = c.activity(values);
        let (amount, description) = match c.op {
            ConstraintOp::Le if lhs > c.rhs + self.tolerance => {
                let amt = lhs - c.rhs;
                (amt, format!("{} exceeds maximum of {:.2} by {:.2}", c.name, c.rhs, amt))
            }
            ConstraintOp::Ge if lhs < c.rhs - self.tolerance => {
                let amt = c.rhs - lhs;
                (amt, format!("{} is below minimum of {:.2} by {:.2}", c.name, c.rhs, amt))
            }
            ConstraintOp::Eq if (lhs - c.rhs).abs() > self.tolerance => (
                (lhs - c.rhs).abs(),
                format!("{} requires exactly {:.2} but got {:.2}", c.name, c.rhs, lhs),
            ),
            _ => return None,
        };
        Some(ConstraintViolation {
            constraint: c.name.clone(),
            required: c.rhs,
            actual: lhs,
            violation_amount: amount,
            description,
        })
    }

    /// Look for rows over the same expression whose minimum exceeds their maximum
    fn analyze_conflicts(&self, problem: &LinearProgram) -> Vec<ConstraintViolation> {
        let mut groups: HashMap<Vec<i8>, Vec<&Constraint>> = HashMap::new();
        for c in &problem.constraints {
            let key = c
                .coefficients
                .iter()
                .map(|&x| {
                    if x.abs() < self.tolerance {
                        0
                    } else if x > 0.0 {
                        1
                    } else {
                        -1
                    }
                })
                .collect();
            groups.entry(key).or_default().push(c);
        }

        let mut conflicts = Vec::new();
        for rows in groups.values() {
            let mut min_bound: Option<&Constraint> = None;
            let mut max_bound: Option<&Constraint> = None;
            for &c in rows {
                if matches!(c.op, ConstraintOp::Ge | ConstraintOp::Eq)
                    && min_bound.is_none_or(|m| c.rhs > m.rhs)
                {
                    min_bound = Some(c);
                }
                if matches!(c.op, ConstraintOp::Le | ConstraintOp::Eq)
                    && max_bound.is_none_or(|m| c.rhs < m.rhs)
                {
                    max_bound = Some(c);
                }
            }
            if let (Some(lo), Some(hi)) = (min_bound, max_bound) {
                if lo.rhs > hi.rhs + self.tolerance {
                    conflicts.push(ConstraintViolation {
                        constraint: format!("{} vs {}", lo.name, hi.name),
                        required: lo.rhs,
                        actual: hi.rhs,
                        violation_amount: lo.rhs - hi.rhs,
                        description: format!(
                            "Conflict: {} requires >= {:.2} but {} requires <= {:.2}",
                            lo.name, lo.rhs, hi.name, hi.rhs
                        ),
                    });
                }
            }
        }
        conflicts.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));
        conflicts
    }
}

/// A row in standard form: non-negative right-hand side
struct StandardRow {
    coefficients: Vec<f64>,
    op: ConstraintOp,
    rhs: f64,
}

/// Flip rows with negative right-hand sides and append variable upper bounds as rows
fn standard_rows(problem: &LinearProgram) -> Vec<StandardRow> {
    let n = problem.num_variables();
    let mut rows: Vec<StandardRow> = problem
        .constraints
        .iter()
        .map(|c| {
            if c.rhs < 0.0 {
                StandardRow {
                    coefficients: c.coefficients.iter().map(|v| -v).collect(),
                    op: c.op.mirrored(),
                    rhs: -c.rhs,
                }
            } else {
                StandardRow {
                    coefficients: c.coefficients.clone(),
                    op: c.op,
                    rhs: c.rhs,
                }
            }
        })
        .collect();

    for (j, bound) in problem.upper_bounds.iter().enumerate() {
        if let Some(ub) = bound {
            let mut coefficients = vec![0.0; n];
            coefficients[j] = 1.0;
            rows.push(StandardRow {
                coefficients,
                op: ConstraintOp::Le,
                rhs: *ub,
            });
        }
    }
    rows
}

/// Dense tableau: `height` constraint rows followed by the objective row,
/// columns are structural | slack/surplus | artificial | rhs.
struct Tableau {
    cells: Vec<f64>,
    width: usize,
    height: usize,
    basis: Vec<usize>,
    structural: usize,
    slack: usize,
    artificial: usize,
}

impl Tableau {
    fn build(rows: &[StandardRow], problem: &LinearProgram) -> Self {
        let structural = problem.num_variables();
        let slack = rows.iter().filter(|r| r.op != ConstraintOp::Eq).count();
        let artificial = rows.iter().filter(|r| r.op != ConstraintOp::Le).count();
        let width = structural + slack + artificial + 1;
        let height = rows.len();

        let mut tableau = Tableau {
            cells: vec![0.0; width * (height + 1)],
            width,
            height,
            basis: vec![0; height],
            structural,
            slack,
            artificial,
        };

        let mut slack_col = structural;
        let mut art_col = structural + slack;
        for (i, row) in rows.iter().enumerate() {
            for (j, &coef) in row.coefficients.iter().enumerate() {
                tableau.set(i, j, coef);
            }
            tableau.set(i, width - 1, row.rhs);
            match row.op {
                ConstraintOp::Le => {
                    tableau.set(i, slack_col, 1.0);
                    tableau.basis[i] = slack_col;
                    slack_col += 1;
                }
                ConstraintOp::Ge => {
                    tableau.set(i, slack_col, -1.0);
                    slack_col += 1;
                    tableau.set(i, art_col, 1.0);
                    tableau.basis[i] = art_col;
                    art_col += 1;
                }
                ConstraintOp::Eq => {
                    tableau.set(i, art_col, 1.0);
                    tableau.basis[i] = art_col;
                    art_col += 1;
                }
            }
        }

        // The objective row holds reduced profits of a maximization
        let sign = if problem.objective.minimize { -1.0 } else { 1.0 };
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            tableau.set_objective(j, sign * coef);
        }
        tableau
    }

    fn at(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.width + col]
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.cells[row * self.width + col] = value;
    }

    fn rhs(&self, row: usize) -> f64 {
        self.at(row, self.width - 1)
    }

    fn objective(&self, col: usize) -> f64 {
        self.at(self.height, col)
    }

    fn set_objective(&mut self, col: usize, value: f64) {
        self.set(self.height, col, value);
    }

    fn objective_row(&self) -> &[f64] {
        &self.cells[self.height * self.width..]
    }

    /// Column with the largest positive reduced profit among the first `limit` columns
    fn entering(&self, limit: usize, tolerance: f64) -> Option<usize> {
        let mut best = tolerance;
        let mut col = None;
        for j in 0..limit {
            let value = self.objective(j);
            if value > best {
                best = value;
                col = Some(j);
            }
        }
        col
    }

    /// Minimum-ratio row; ties go to the smallest basic index to avoid cycling
    fn leaving(&self, col: usize, tolerance: f64) -> Option<usize> {
        let mut best: Option<(f64, usize)> = None;
        for i in 0..self.height {
            let a = self.at(i, col);
            if a <= tolerance {
                continue;
            }
            let ratio = self.rhs(i) / a;
            best = match best {
                Some((r, row)) if ratio > r + tolerance => Some((r, row)),
                Some((r, row)) if (ratio - r).abs() <= tolerance && self.basis[row] < self.basis[i] => {
                    Some((r, row))
                }
                _ => Some((ratio, i)),
            };
        }
        best.map(|(_, row)| row)
    }

    fn pivot(&mut self, row: usize, col: usize) {
        self.basis[row] = col;

        let pivot = self.at(row, col);
        for j in 0..self.width {
            let v = self.at(row, j) / pivot;
            self.set(row, j, v);
        }

        for i in 0..=self.height {
            if i == row {
                continue;
            }
            let factor = self.at(i, col);
            if factor == 0.0 {
                continue;
            }
            for j in 0..self.width {
                let v = self.at(i, j) - factor * self.at(row, j);
                self.set(i, j, v);
            }
        }
    }

    fn structural_values(&self) -> Vec<f64> {
        let mut values = vec![0.0; self.structural];
        for (i, &basic) in self.basis.iter().enumerate() {
            if basic < self.structural {
                values[basic] = self.rhs(i).max(0.0);
            }
        }
        values
    }
}

enum PhaseOutcome {
    Optimal,
    Unbounded,
    IterationLimit,
}
