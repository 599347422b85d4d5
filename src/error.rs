// error.rs - Crate-wide error type

use std::path::PathBuf;

use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IsingError {
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot parse {value:?} in {file}, row {row}, column {column}")]
    Parse {
        file: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("column {column:?} missing from {file}")]
    MissingColumn { file: String, column: String },

    #[error("lattice size must be at least 2, got {0}")]
    InvalidLatticeSize(usize),

    #[error("temperature must be positive and finite, got {0}")]
    InvalidTemperature(f64),

    #[error("spin at ({row}, {col}) is {value}, expected -1 or +1")]
    InvalidSpin { row: usize, col: usize, value: i8 },

    #[error("state table describes {found} spins, expected {expected}")]
    UnexpectedSpinCount { expected: usize, found: usize },

    #[error("{spins} spins is too many to enumerate (max {max})")]
    TooManySpins { spins: usize, max: usize },

    #[error("no data: {0}")]
    EmptyData(String),

    #[error("linear fit is degenerate: {0}")]
    DegenerateFit(String),

    #[error("{quantity}: {left} != {right} (relative difference {rel_diff:e} > {tol:e})")]
    Mismatch {
        quantity: String,
        left: f64,
        right: f64,
        rel_diff: f64,
        tol: f64,
    },

    #[error("plotting failed: {0}")]
    Plot(String),

    #[error("runner {program} failed: {reason}")]
    Runner { program: String, reason: String },
}

pub type Result<T> = std::result::Result<T, IsingError>;

impl IsingError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IsingError::Io { path: path.into(), source }
    }
}

impl<E> From<DrawingAreaErrorKind<E>> for IsingError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        IsingError::Plot(err.to_string())
    }
}
