//! Statistical analysis over surfaces and zones
//!
//! - **zonal**: per-polygon means of a surface
//! - **ols**: single-predictor ordinary least squares

pub mod ols;
pub mod zonal;

pub use ols::{fit, Ols, OlsFit, OlsInput};
pub use zonal::{zonal_means, TouchMode, ZonalMean, ZonalMeans};
