//! Error types for zonalreg

use std::fmt;
use thiserror::Error;

/// Pipeline stage a fatal error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadPoints,
    Interpolate,
    Aggregate,
    Regress,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::LoadPoints => "load-points",
            Stage::Interpolate => "interpolate",
            Stage::Aggregate => "aggregate",
            Stage::Regress => "regress",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Main error type for zonalreg operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid sample point #{index}: ({x}, {y}) = {value} (coordinates and value must be finite)")]
    InvalidPoint { index: usize, x: f64, y: f64, value: f64 },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Insufficient samples: need at least {needed}, got {got}")]
    InsufficientSamples { needed: usize, got: usize },

    #[error("Invalid sample #{index}: predictor = {predictor}, response = {response} (must be finite)")]
    InvalidSample {
        index: usize,
        predictor: f64,
        response: f64,
    },

    #[error("Length mismatch: {predictor} predictor values vs {response} response values")]
    LengthMismatch { predictor: usize, response: usize },

    #[error("Singular design: {0}")]
    SingularDesign(String),

    #[error("Duplicate zone id: {0}")]
    DuplicateZoneId(String),

    #[error("Invalid grid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in grid of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the pipeline stage that produced this error
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            // already tagged by an inner stage
            Error::Stage { .. } => self,
            other => Error::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was tagged with, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error with any stage tag removed
    pub fn root(&self) -> &Error {
        match self {
            Error::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for zonalreg operations
pub type Result<T> = std::result::Result<T, Error>;
