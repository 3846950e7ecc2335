use kryst::solver::LinearSolver;
use kryst::{
    parallel::{NoComm, UniverseComm},
    preconditioner::PcSide,
};
use log::{debug, warn};
use nalgebra::DVector;
use std::sync::Arc;

use crate::numerics::solver::{residual_norm, Factorization, SolveStats, SolverError, SystemSolver};
use crate::numerics::system_matrix::{StorageKind, SystemMatrix};
use crate::numerics::IterationBudget;

/// Iterative solver: BiCGSTAB on the Jacobi row-scaled system.
///
/// "Factorizing" here only converts the matrix to kryst's CSR and stores the
/// row scaling; the previous solution is used as the initial guess.
pub struct BiCgStab {
    budget: IterationBudget,
    operator: Option<Arc<kryst::matrix::sparse::CsrMatrix<f64>>>,
    scaling: DVector<f64>,
    matrix: Option<SystemMatrix>,
}

impl BiCgStab {
    pub fn new(budget: IterationBudget) -> Self {
        Self {
            budget,
            operator: None,
            scaling: DVector::zeros(0),
            matrix: None,
        }
    }
}

impl SystemSolver for BiCgStab {
    fn name(&self) -> &'static str {
        "bicgstab"
    }

    fn preferred_storage(&self) -> StorageKind {
        StorageKind::CompressedRow
    }

    fn factorize(&mut self, matrix: &SystemMatrix, mode: Factorization) -> Result<(), SolverError> {
        debug!("{}: preparing {} unknowns ({:?})", self.name(), matrix.size, mode);
        let n = matrix.size;
        let (indptr, indices, mut data) = matrix.to_csr();

        // Jacobi row scaling
        let scaling = DVector::from_iterator(
            n,
            (0..n).map(|row| {
                let diag = (indptr[row]..indptr[row + 1])
                    .find(|&k| indices[k] == row)
                    .map_or(0.0, |k| data[k]);
                if diag.abs() < 1e-300 { 1.0 } else { diag }
            }),
        );
        for row in 0..n {
            for value in &mut data[indptr[row]..indptr[row + 1]] {
                *value /= scaling[row];
            }
        }

        self.operator = Some(Arc::new(kryst::matrix::sparse::CsrMatrix::from_csr(
            n, n, indptr, indices, data,
        )));
        self.scaling = scaling;
        self.matrix = Some(matrix.clone());
        Ok(())
    }

    fn solve(
        &mut self,
        rhs: &DVector<f64>,
        x: &mut DVector<f64>,
    ) -> Result<SolveStats, SolverError> {
        let (operator, matrix) = match (&self.operator, &self.matrix) {
            (Some(operator), Some(matrix)) => (operator, matrix),
            _ => return Err(SolverError::NotFactorized),
        };
        let n = matrix.size;
        if rhs.len() != n || x.len() != n {
            return Err(SolverError::DimensionMismatch {
                matrix: n,
                vector: rhs.len().min(x.len()),
            });
        }

        let b = rhs.component_div(&self.scaling);
        let b_norm = b.norm();
        let threshold = self.budget.threshold(b_norm);

        let op = kryst::matrix::op::CsrOp::new(Arc::clone(operator));
        let mut solver =
            kryst::solver::bicgstab::BiCgStabSolver::new(threshold, self.budget.max_iterations);
        let mut workspace = kryst::context::ksp_context::Workspace::new(n);
        solver.setup_workspace(&mut workspace);

        let result = solver.solve(
            &op,
            None,
            b.as_slice(),
            x.as_mut_slice(),
            PcSide::Left,
            &UniverseComm::NoComm(NoComm {}),
            None,
            Some(&mut workspace),
        );
        let stats = result.map_err(|e| SolverError::Backend(format!("{:?}", e)))?;
        debug!("{}: {:?}", self.name(), stats);
        let iterations = stats.iterations;

        if !x.iter().all(|v| v.is_finite()) {
            return Err(SolverError::Backend("BiCGSTAB produced NaN or Inf".to_string()));
        }

        let scaled_residual = (matrix.multiply(x) - rhs).component_div(&self.scaling).norm();
        if !self.budget.tolerance.is_met(scaled_residual, b_norm) {
            warn!(
                "{}: scaled residual {:.3e} above tolerance after {} iterations",
                self.name(),
                scaled_residual,
                iterations
            );
            return Err(SolverError::NonConvergence {
                iterations,
                residual: scaled_residual,
            });
        }

        Ok(SolveStats {
            iterations: Some(iterations),
            residual: residual_norm(matrix, rhs, x),
        })
    }
}
