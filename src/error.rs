use crate::numerics::solver::SolverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThermalError {
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("invalid stack: {0}")]
    InvalidStack(String),

    #[error("stack element `{0}` not found")]
    UnknownElement(String),

    #[error("duplicate identifier `{0}`")]
    DuplicateId(String),

    #[error("material `{0}` not found")]
    UnknownMaterial(String),

    #[error("floorplan element `{0}` lies outside the chip")]
    ElementOutsideChip(String),

    #[error("floorplan elements `{0}` and `{1}` overlap")]
    OverlappingElements(String, String),

    #[error("floorplan element `{0}` does not cover any cell")]
    EmptyElement(String),

    #[error("not enough power values: expected {expected}, found {found}")]
    NotEnoughPowerValues { expected: usize, found: usize },

    #[error("system matrix assembly wrote {written} entries, expected {expected}")]
    NonZeroMismatch { written: usize, expected: usize },

    #[error("wrong configuration: {0}")]
    WrongConfig(String),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type ThermalResult<T> = Result<T, ThermalError>;
