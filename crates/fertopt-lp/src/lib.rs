mod error;
mod problem;
mod simplex;
mod solution;

pub use error::LpError;
pub use problem::{Constraint, ConstraintOp, LinearProgram, Objective};
pub use simplex::Solver;
pub use solution::{ConstraintViolation, Solution, SolutionStatus};
