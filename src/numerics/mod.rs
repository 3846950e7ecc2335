pub mod solver;
#[cfg(feature = "krylov")]
pub mod sparse;
pub mod system_matrix;
pub mod system_vector;
pub mod timing;

pub use solver::{Factorization, SolveStats, SolverBackend, SolverError, SparseLu, SystemSolver};
#[cfg(feature = "krylov")]
pub use sparse::BiCgStab;
pub use system_matrix::{StorageKind, SystemMatrix};
pub use system_vector::SystemVector;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tolerance {
    Absolute(f64),
    Relative(f64),
    Combined(f64, f64),
}

impl Tolerance {
    pub fn is_met(&self, norm: f64, initial_norm: f64) -> bool {
        let relative = if initial_norm == 0.0 { 0.0 } else { norm / initial_norm };
        match *self {
            Tolerance::Absolute(tol) => norm < tol,
            Tolerance::Relative(tol) => relative < tol,
            Tolerance::Combined(abs_tol, rel_tol) => norm < abs_tol || relative < rel_tol,
        }
    }
}

/// Stopping rule of the iterative backends.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IterationBudget {
    pub tolerance: Tolerance,
    pub max_iterations: usize,
}

impl Default for IterationBudget {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::Relative(1e-10),
            max_iterations: 2000,
        }
    }
}

impl IterationBudget {
    /// Absolute threshold handed to a backend that only understands one,
    /// given the norm of the right-hand side.
    pub fn threshold(&self, rhs_norm: f64) -> f64 {
        match self.tolerance {
            Tolerance::Absolute(tol) => tol,
            Tolerance::Relative(tol) => tol * rhs_norm,
            Tolerance::Combined(abs_tol, rel_tol) => abs_tol.max(rel_tol * rhs_norm),
        }
    }
}
