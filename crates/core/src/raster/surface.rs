//! Interpolated grid surface

use crate::error::{Error, Result};
use crate::raster::GridSpec;
use ndarray::Array2;
use serde::Serialize;

/// A dense grid of interpolated values.
///
/// Values are stored row-major as `(row, col)` following the placement in
/// [`GridSpec`]. Cells without an estimate hold NaN.
///
/// # Example
///
/// ```ignore
/// use zonalreg_core::{GridSpec, Surface};
///
/// let spec = GridSpec::new(0.0, 10.0, 1.0, 1.0, 10, 10)?;
/// let surface = Surface::filled(spec, 3.5);
/// assert_eq!(surface.get(2, 7)?, 3.5);
/// ```
#[derive(Debug, Clone)]
pub struct Surface {
    data: Array2<f64>,
    spec: GridSpec,
}

impl Surface {
    /// Create a surface with every cell set to `value`
    pub fn filled(spec: GridSpec, value: f64) -> Self {
        Self {
            data: Array2::from_elem((spec.rows, spec.cols), value),
            spec,
        }
    }

    /// Create a surface from row-major cell values
    pub fn from_vec(spec: GridSpec, data: Vec<f64>) -> Result<Self> {
        if data.len() != spec.len() {
            return Err(Error::InvalidDimensions {
                width: spec.cols,
                height: spec.rows,
            });
        }

        let data = Array2::from_shape_vec((spec.rows, spec.cols), data).map_err(|_| {
            Error::InvalidDimensions {
                width: spec.cols,
                height: spec.rows,
            }
        })?;

        Ok(Self { data, spec })
    }

    /// Grid placement
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Min, max and mean over the cells that hold an estimate
    pub fn statistics(&self) -> SurfaceStatistics {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;

        for &value in self.data.iter().filter(|v| !v.is_nan()) {
            min = min.min(value);
            max = max.max(value);
            sum += value;
            count += 1;
        }

        let (min, max, mean) = if count > 0 {
            (Some(min), Some(max), Some(sum / count as f64))
        } else {
            (None, None, None)
        };

        SurfaceStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Summary of a surface's valid cells
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
