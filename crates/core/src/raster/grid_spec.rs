//! Grid geometry for interpolated surfaces

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of cells along the longer axis of a derived grid
pub const DEFAULT_MAX_CELLS: usize = 256;

/// Default margin added on each side of a derived grid, as a fraction of the
/// larger extent span
pub const DEFAULT_MARGIN_FRACTION: f64 = 0.05;

/// Axis-aligned bounding rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Smallest extent containing all the given coordinates.
    ///
    /// Returns `None` for an empty iterator.
    pub fn enclosing<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        coords.into_iter().fold(None, |acc, (x, y)| match acc {
            None => Some(Self::new(x, y, x, y)),
            Some(e) => Some(Self::new(
                e.min_x.min(x),
                e.min_y.min(y),
                e.max_x.max(x),
                e.max_y.max(y),
            )),
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// Placement and resolution of a north-up grid.
///
/// Cell `(row, col)` covers
/// ```text
/// x ∈ [origin_x + col * cell_width,  origin_x + (col + 1) * cell_width]
/// y ∈ [origin_y - (row + 1) * cell_height, origin_y - row * cell_height]
/// ```
/// so the origin is the upper-left corner and rows advance southward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Cell size along x (positive)
    pub cell_width: f64,
    /// Cell size along y (positive)
    pub cell_height: f64,
    /// Number of columns
    pub cols: usize,
    /// Number of rows
    pub rows: usize,
}

impl GridSpec {
    /// Create a grid spec, checking that cell sizes are positive and finite
    /// and that the grid is non-empty.
    pub fn new(
        origin_x: f64,
        origin_y: f64,
        cell_width: f64,
        cell_height: f64,
        cols: usize,
        rows: usize,
    ) -> Result<Self> {
        let spec = Self {
            origin_x,
            origin_y,
            cell_width,
            cell_height,
            cols,
            rows,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Check the invariants of a (possibly hand-built) grid spec
    pub fn validate(&self) -> Result<()> {
        if self.cols == 0 || self.rows == 0 {
            return Err(Error::InvalidDimensions {
                width: self.cols,
                height: self.rows,
            });
        }
        if !self.origin_x.is_finite() || !self.origin_y.is_finite() {
            return Err(Error::InvalidParameter {
                name: "origin",
                value: format!("({}, {})", self.origin_x, self.origin_y),
                reason: "must be finite".into(),
            });
        }
        for (name, size) in [("cell_width", self.cell_width), ("cell_height", self.cell_height)] {
            if !(size.is_finite() && size > 0.0) {
                return Err(Error::InvalidParameter {
                    name,
                    value: size.to_string(),
                    reason: "must be positive and finite".into(),
                });
            }
        }
        Ok(())
    }

    /// Derive a square-celled grid covering `extent` plus a margin.
    ///
    /// The margin is `margin_fraction` of the larger span on every side; a
    /// degenerate extent (all coordinates equal) is treated as having span 1.
    /// The longer axis receives `max_cells` cells, the shorter axis as many as
    /// are needed to cover it.
    pub fn covering(extent: &Extent, max_cells: usize, margin_fraction: f64) -> Result<Self> {
        if max_cells == 0 {
            return Err(Error::InvalidParameter {
                name: "max_cells",
                value: max_cells.to_string(),
                reason: "must be at least 1".into(),
            });
        }
        if !(margin_fraction.is_finite() && margin_fraction >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "margin_fraction",
                value: margin_fraction.to_string(),
                reason: "must be non-negative and finite".into(),
            });
        }

        let (cx, cy) = (
            (extent.min_x + extent.max_x) / 2.0,
            (extent.min_y + extent.max_y) / 2.0,
        );
        let extent = if extent.width().max(extent.height()) > 0.0 {
            *extent
        } else {
            Extent::new(cx - 0.5, cy - 0.5, cx + 0.5, cy + 0.5)
        };

        let margin = extent.width().max(extent.height()) * margin_fraction;
        let full_w = extent.width() + 2.0 * margin;
        let full_h = extent.height() + 2.0 * margin;
        let cell = full_w.max(full_h) / max_cells as f64;

        let cols = ((full_w / cell).ceil() as usize).clamp(1, max_cells);
        let rows = ((full_h / cell).ceil() as usize).clamp(1, max_cells);

        // Center the (possibly slightly larger) grid on the extent
        let origin_x = cx - cols as f64 * cell / 2.0;
        let origin_y = cy + rows as f64 * cell / 2.0;

        Self::new(origin_x, origin_y, cell, cell, cols, rows)
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates of the center of cell (row, col)
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let x = self.origin_x + (col as f64 + 0.5) * self.cell_width;
        let y = self.origin_y - (row as f64 + 0.5) * self.cell_height;
        (x, y)
    }

    /// Bounds of cell (row, col)
    pub fn cell_extent(&self, row: usize, col: usize) -> Extent {
        let min_x = self.origin_x + col as f64 * self.cell_width;
        let max_y = self.origin_y - row as f64 * self.cell_height;
        Extent::new(min_x, max_y - self.cell_height, min_x + self.cell_width, max_y)
    }

    /// Fractional (col, row) position of a coordinate; use `.floor()` for indices
    pub fn locate(&self, x: f64, y: f64) -> (f64, f64) {
        let col = (x - self.origin_x) / self.cell_width;
        let row = (self.origin_y - y) / self.cell_height;
        (col, row)
    }

    /// Bounds of the whole grid
    pub fn extent(&self) -> Extent {
        Extent::new(
            self.origin_x,
            self.origin_y - self.rows as f64 * self.cell_height,
            self.origin_x + self.cols as f64 * self.cell_width,
            self.origin_y,
        )
    }

    /// Half-open row and column index ranges of the cells overlapping
    /// `extent` (boundaries included). `None` when the extent misses the grid.
    pub fn window(&self, extent: &Extent) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
        if !self.extent().intersects(extent) {
            return None;
        }

        let (c0, r0) = self.locate(extent.min_x, extent.max_y);
        let (c1, r1) = self.locate(extent.max_x, extent.min_y);

        let clamp = |v: f64, n: usize| -> usize { v.max(0.0).min(n as f64) as usize };

        // A coordinate on a cell edge belongs to both neighbours
        let col_start = clamp(c0.floor() - 1.0, self.cols);
        let row_start = clamp(r0.floor() - 1.0, self.rows);
        let col_end = clamp(c1.floor() + 2.0, self.cols);
        let row_end = clamp(r1.floor() + 2.0, self.rows);

        if col_start >= col_end || row_start >= row_end {
            return None;
        }
        Some((row_start..row_end, col_start..col_end))
    }
}
