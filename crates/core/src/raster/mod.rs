//! Grid placement and interpolated surfaces

mod grid_spec;
mod surface;

pub use grid_spec::{Extent, GridSpec, DEFAULT_MARGIN_FRACTION, DEFAULT_MAX_CELLS};
pub use surface::{Surface, SurfaceStatistics};
