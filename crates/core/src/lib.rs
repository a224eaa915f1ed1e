//! # zonalreg Core
//!
//! Core types for the zonalreg interpolation, aggregation and regression
//! pipeline.
//!
//! This crate provides:
//! - `SamplePoint` / `PointStore`: validated scattered measurements
//! - `Zone` / `ZoneSet`: polygons carrying a response value
//! - `GridSpec` / `Surface`: interpolated grids and their placement
//! - `Error`: the error taxonomy shared by every stage
//! - `Algorithm`: trait giving each stage a uniform entry point

pub mod error;
pub mod points;
pub mod raster;
pub mod vector;

pub use error::{Error, Result, Stage};
pub use points::{PointStore, SamplePoint};
pub use raster::{Extent, GridSpec, Surface};
pub use vector::{Zone, ZoneSet};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result, Stage};
    pub use crate::points::{PointStore, SamplePoint};
    pub use crate::raster::{Extent, GridSpec, Surface};
    pub use crate::vector::{Zone, ZoneSet};
    pub use crate::Algorithm;
}

/// Core trait for the pipeline stages.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
