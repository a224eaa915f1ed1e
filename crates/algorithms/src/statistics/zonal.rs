//! Zonal statistics over polygons
//!
//! Averages the cells of a surface that fall in each polygon zone. Which
//! cells belong to a zone is decided by a [`TouchMode`].

use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Coord, Line};
use serde::Serialize;
use tracing::warn;
use zonalreg_core::raster::{Extent, Surface};
use zonalreg_core::{Algorithm, Error, Result, Zone, ZoneSet};

use crate::maybe_rayon::*;

/// Rule selecting the cells that belong to a polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TouchMode {
    /// Cells whose center lies inside the polygon or on its boundary
    Center,
    /// Cells whose interior shares any area with the polygon, including
    /// cells only crossed by its boundary. Cells that merely share an edge
    /// or a corner with the polygon are not counted.
    #[default]
    AllTouched,
}

/// Mean of the surface over one zone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZonalMean {
    pub zone_id: String,
    /// Number of valid (non-NaN) cells that matched the zone
    pub cell_count: usize,
    /// `None` when no valid cell matched
    pub mean: Option<f64>,
}

/// Zonal mean algorithm
#[derive(Debug, Clone, Default)]
pub struct ZonalMeans;

impl Algorithm for ZonalMeans {
    type Input = (Surface, ZoneSet);
    type Output = Vec<ZonalMean>;
    type Params = TouchMode;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Zonal Mean"
    }

    fn description(&self) -> &'static str {
        "Average surface cells per polygon zone"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (surface, zones) = input;
        Ok(zonal_means(&surface, zones.as_slice(), params))
    }
}

/// Compute the mean surface value of every zone.
///
/// Returns one record per zone, in the order of `zones`. NaN cells are
/// skipped. A zone with no matching valid cell gets `mean: None` and a
/// warning is logged; it is never given a substitute value.
///
/// Only the cells inside each zone's bounding-box window are visited.
pub fn zonal_means(surface: &Surface, zones: &[Zone], mode: TouchMode) -> Vec<ZonalMean> {
    zones
        .par_iter()
        .map(|zone| {
            let (count, sum) = accumulate(surface, zone, mode);
            let mean = (count > 0).then(|| sum / count as f64);

            if mean.is_none() {
                warn!(zone = %zone.id, ?mode, "no grid cell overlaps zone");
            }

            ZonalMean {
                zone_id: zone.id.clone(),
                cell_count: count,
                mean,
            }
        })
        .collect()
}

/// (count, sum) of the valid cells matching `zone`
fn accumulate(surface: &Surface, zone: &Zone, mode: TouchMode) -> (usize, f64) {
    let spec = surface.spec();
    let Some((rows, cols)) = zone.extent().and_then(|e| spec.window(&e)) else {
        return (0, 0.0);
    };

    let edges: Vec<Line<f64>> = match mode {
        TouchMode::Center => Vec::new(),
        TouchMode::AllTouched => std::iter::once(zone.polygon.exterior())
            .chain(zone.polygon.interiors())
            .flat_map(|ring| ring.lines())
            .collect(),
    };

    let data = surface.data();
    let mut count = 0usize;
    let mut sum = 0.0;
    // Neumaier compensation keeps the mean of a constant surface within an ulp
    let mut compensation = 0.0;

    for row in rows {
        for col in cols.clone() {
            let value = data[(row, col)];
            if value.is_nan() {
                continue;
            }

            let (cx, cy) = spec.cell_center(row, col);
            let center_in = zone.polygon.coordinate_position(&Coord { x: cx, y: cy }) != CoordPos::Outside;

            let touched = center_in
                || (mode == TouchMode::AllTouched && {
                    let cell = spec.cell_extent(row, col);
                    edges.iter().any(|edge| crosses_interior(edge, &cell))
                });

            if touched {
                count += 1;
                let t = sum + value;
                compensation += if sum.abs() >= value.abs() {
                    (sum - t) + value
                } else {
                    (value - t) + sum
                };
                sum = t;
            }
        }
    }

    (count, sum + compensation)
}

/// Whether a segment passes through the open interior of a cell.
///
/// The segment is clipped to the closed cell (Liang-Barsky); it enters the
/// interior iff the midpoint of the clipped part is strictly inside.
fn crosses_interior(edge: &Line<f64>, cell: &Extent) -> bool {
    let (a, b) = (edge.start, edge.end);
    let (dx, dy) = (b.x - a.x, b.y - a.y);

    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    for (p, q) in [
        (-dx, a.x - cell.min_x),
        (dx, cell.max_x - a.x),
        (-dy, a.y - cell.min_y),
        (dy, cell.max_y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return false;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return false;
            }
            t1 = t1.min(r);
        }
    }

    let t = (t0 + t1) / 2.0;
    let (mx, my) = (a.x + t * dx, a.y + t * dy);
    mx > cell.min_x && mx < cell.max_x && my > cell.min_y && my < cell.max_y
}
