//! # zonalreg Algorithms
//!
//! Pipeline stages for relating a gridded point measurement to per-zone
//! responses.
//!
//! ## Available Algorithm Categories
//!
//! - **interpolation**: IDW gridding with optional neighbour search
//! - **statistics**: Zonal means over polygons, single-predictor OLS
//! - **pipeline**: The stages composed, with a surface cache

pub mod interpolation;
pub(crate) mod maybe_rayon;
pub mod pipeline;
pub mod statistics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::interpolation::{idw, idw_at, Idw, IdwParams, IdwSearch};
    pub use crate::pipeline::{
        run, AnnotatedZone, Pipeline, PipelineConfig, PipelineOutput, SurfaceCache, POWER_RANGE,
    };
    pub use crate::statistics::{fit, zonal_means, Ols, OlsFit, OlsInput, TouchMode, ZonalMean, ZonalMeans};
    pub use zonalreg_core::prelude::*;
}
