use crate::numerics::system_matrix::{StorageKind, SystemMatrix};
use crate::numerics::IterationBudget;
use faer::prelude::Solve;
use faer::sparse::linalg::solvers::{Lu, SymbolicLu};
use faer::sparse::{SparseColMat, SymbolicSparseColMat};
use faer::Col;
use log::debug;
use nalgebra::DVector;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("the system matrix has not been factorized")]
    NotFactorized,
    #[error("the system matrix is singular")]
    Singular,
    #[error(
        "iterative solver did not converge in {iterations} iterations (residual {residual:.3e})"
    )]
    NonConvergence { iterations: usize, residual: f64 },
    #[error("dimension mismatch: matrix of size {matrix}, vector of size {vector}")]
    DimensionMismatch { matrix: usize, vector: usize },
    #[error("linear solver backend failed: {0}")]
    Backend(String),
}

/// What the next factorization may reuse from the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factorization {
    /// Nothing to reuse: analyse and factorize from scratch.
    DoFact,
    /// Same sparsity pattern, new values.
    SamePattern,
    /// The current factors match the matrix.
    Factored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveStats {
    /// Iterations used by an iterative backend; `None` for direct solvers.
    pub iterations: Option<usize>,
    /// Achieved `||A x - b||`.
    pub residual: f64,
}

/// Linear solver for the system `A x = b`.
///
/// `factorize` is called whenever `A` changes; `solve` may then be called any
/// number of times with different right-hand sides.
pub trait SystemSolver: Send {
    fn name(&self) -> &'static str;

    /// Storage the assembly should produce for this solver.
    fn preferred_storage(&self) -> StorageKind;

    fn factorize(&mut self, matrix: &SystemMatrix, mode: Factorization) -> Result<(), SolverError>;

    /// Solves for `x`, using its content as initial guess where that helps.
    /// On error `x` holds unspecified values.
    fn solve(&mut self, rhs: &DVector<f64>, x: &mut DVector<f64>)
        -> Result<SolveStats, SolverError>;
}

/// Direct solver: sparse LU with partial pivoting on the compressed columns.
///
/// The symbolic analysis (fill-reducing ordering and elimination tree) is
/// kept and reused by [`Factorization::SamePattern`] refactorizations.
#[derive(Default)]
pub struct SparseLu {
    symbolic: Option<SymbolicLu<usize>>,
    pattern: Option<(Vec<usize>, Vec<usize>)>,
    lu: Option<Lu<usize, f64>>,
    matrix: Option<SystemMatrix>,
    analyses: usize,
}

impl SparseLu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of symbolic analyses run so far.
    pub fn symbolic_analyses(&self) -> usize {
        self.analyses
    }

    fn same_pattern(&self, matrix: &SystemMatrix) -> bool {
        matches!(&self.pattern, Some((pointers, indices))
            if *pointers == matrix.pointers && *indices == matrix.indices)
    }
}

impl SystemSolver for SparseLu {
    fn name(&self) -> &'static str {
        "sparse-lu"
    }

    fn preferred_storage(&self) -> StorageKind {
        StorageKind::CompressedColumn
    }

    fn factorize(&mut self, matrix: &SystemMatrix, mode: Factorization) -> Result<(), SolverError> {
        if matrix.kind != StorageKind::CompressedColumn {
            return Err(SolverError::Backend(format!(
                "{} needs compressed-column storage",
                self.name()
            )));
        }
        if mode == Factorization::Factored && self.lu.is_some() && self.same_pattern(matrix) {
            return Ok(());
        }

        self.lu = None;
        self.matrix = None;

        let pattern = SymbolicSparseColMat::<usize>::new_checked(
            matrix.size,
            matrix.size,
            matrix.pointers.clone(),
            None,
            matrix.indices.clone(),
        );

        let symbolic = match &self.symbolic {
            Some(symbolic) if mode == Factorization::SamePattern && self.same_pattern(matrix) => {
                debug!("{}: reusing the symbolic analysis", self.name());
                symbolic.clone()
            }
            _ => {
                let symbolic = SymbolicLu::try_new(pattern.as_ref())
                    .map_err(|e| SolverError::Backend(format!("{:?}", e)))?;
                self.analyses += 1;
                self.symbolic = Some(symbolic.clone());
                self.pattern = Some((matrix.pointers.clone(), matrix.indices.clone()));
                symbolic
            }
        };

        debug!("{}: factorizing {} unknowns ({:?})", self.name(), matrix.size, mode);
        let values = SparseColMat::new(pattern, matrix.values.clone());
        let lu = Lu::try_new_with_symbolic(symbolic, values.as_ref()).map_err(|e| {
            debug!("{}: {:?}", self.name(), e);
            SolverError::Singular
        })?;

        self.lu = Some(lu);
        self.matrix = Some(matrix.clone());
        Ok(())
    }

    fn solve(
        &mut self,
        rhs: &DVector<f64>,
        x: &mut DVector<f64>,
    ) -> Result<SolveStats, SolverError> {
        let (lu, matrix) = match (&self.lu, &self.matrix) {
            (Some(lu), Some(matrix)) => (lu, matrix),
            _ => return Err(SolverError::NotFactorized),
        };
        let n = matrix.size;
        if rhs.len() != n || x.len() != n {
            return Err(SolverError::DimensionMismatch {
                matrix: n,
                vector: rhs.len().min(x.len()),
            });
        }

        let mut solution = Col::<f64>::from_fn(n, |i| rhs[i]);
        lu.solve_in_place(solution.as_mut());
        for i in 0..n {
            x[i] = solution[i];
        }
        if !x.iter().all(|v| v.is_finite()) {
            return Err(SolverError::Singular);
        }

        Ok(SolveStats {
            iterations: None,
            residual: residual_norm(matrix, rhs, x),
        })
    }
}

/// `||A x - b||`.
pub fn residual_norm(matrix: &SystemMatrix, rhs: &DVector<f64>, x: &DVector<f64>) -> f64 {
    (matrix.multiply(x) - rhs).norm()
}

/// Linear solver selection, as read from a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolverBackend {
    #[default]
    SparseLu,
    /// Jacobi-scaled BiCGSTAB, needs the `krylov` feature.
    BiCgStab {
        #[serde(default)]
        budget: IterationBudget,
    },
}

impl SolverBackend {
    pub fn build(&self) -> Result<Box<dyn SystemSolver>, SolverError> {
        match *self {
            SolverBackend::SparseLu => Ok(Box::new(SparseLu::new())),
            #[cfg(feature = "krylov")]
            SolverBackend::BiCgStab { budget } => {
                Ok(Box::new(crate::numerics::sparse::BiCgStab::new(budget)))
            }
            #[cfg(not(feature = "krylov"))]
            SolverBackend::BiCgStab { .. } => Err(SolverError::Backend(
                "BiCGSTAB requires the `krylov` feature".to_string(),
            )),
        }
    }
}
