//! Inverse Distance Weighting (IDW) interpolation
//!
//! Estimates values at unknown locations as a weighted average of sample
//! points, where weights are inversely proportional to distance raised to a
//! power parameter.
//!
//! Reference:
//! Shepard, D. (1968). A two-dimensional interpolation function for
//! irregularly-spaced data. ACM National Conference.

use std::time::Instant;

use tracing::debug;
use zonalreg_core::raster::{GridSpec, Surface, DEFAULT_MARGIN_FRACTION, DEFAULT_MAX_CELLS};
use zonalreg_core::{Algorithm, Error, PointStore, Result, SamplePoint};

use super::kdtree::KdTree;
use crate::maybe_rayon::*;

/// Neighbour search settings, mirroring GDAL's `invdist` options.
///
/// The defaults give global IDW: every point contributes to every cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdwSearch {
    /// Smoothing term added to distances: `d = sqrt(dx² + dy² + s²)`.
    pub smoothing: f64,
    /// Points farther than this from a cell center are ignored.
    pub max_radius: Option<f64>,
    /// Use at most this many nearest points per cell.
    pub max_points: Option<usize>,
    /// Cells with fewer contributing points than this are left as NaN.
    pub min_points: usize,
}

impl Default for IdwSearch {
    fn default() -> Self {
        Self {
            smoothing: 0.0,
            max_radius: None,
            max_points: None,
            min_points: 0,
        }
    }
}

impl IdwSearch {
    /// Whether neighbours have to be selected per cell
    pub fn is_limited(&self) -> bool {
        self.max_radius.is_some() || self.max_points.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.smoothing.is_finite() && self.smoothing >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "smoothing",
                value: self.smoothing.to_string(),
                reason: "must be non-negative and finite".into(),
            });
        }
        if let Some(r) = self.max_radius {
            if !(r.is_finite() && r > 0.0) {
                return Err(Error::InvalidParameter {
                    name: "max_radius",
                    value: r.to_string(),
                    reason: "must be positive and finite".into(),
                });
            }
        }
        if self.max_points == Some(0) {
            return Err(Error::InvalidParameter {
                name: "max_points",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Parameters for IDW interpolation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdwParams {
    /// Power parameter (default: 1.0). Must be finite and ≥ 0.
    /// Higher values give more weight to nearby points; 0 weights all
    /// points equally.
    pub power: f64,
    /// Output grid. `None` derives one from the point extent.
    pub grid: Option<GridSpec>,
    /// Cells along the longer axis of a derived grid
    pub max_cells: usize,
    /// Margin around the point extent of a derived grid, as a fraction of
    /// the larger span
    pub margin_fraction: f64,
    /// Neighbour search settings
    pub search: IdwSearch,
}

impl Default for IdwParams {
    fn default() -> Self {
        Self {
            power: 1.0,
            grid: None,
            max_cells: DEFAULT_MAX_CELLS,
            margin_fraction: DEFAULT_MARGIN_FRACTION,
            search: IdwSearch::default(),
        }
    }
}

impl IdwParams {
    /// Grid the surface will be computed on for `store`
    pub fn resolve_grid(&self, store: &PointStore) -> Result<GridSpec> {
        match self.grid {
            Some(grid) => {
                grid.validate()?;
                Ok(grid)
            }
            None => {
                let extent = store.extent().ok_or_else(|| {
                    Error::InsufficientData("cannot derive a grid from an empty point set".into())
                })?;
                GridSpec::covering(&extent, self.max_cells, self.margin_fraction)
            }
        }
    }
}

/// IDW gridding algorithm
#[derive(Debug, Clone, Default)]
pub struct Idw;

impl Algorithm for Idw {
    type Input = PointStore;
    type Output = Surface;
    type Params = IdwParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "IDW"
    }

    fn description(&self) -> &'static str {
        "Grid scattered samples by inverse distance weighting (Shepard, 1968)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        idw(&input, params)
    }
}

/// Perform IDW interpolation from scattered points to a grid.
///
/// # Algorithm
///
/// For each output cell center (x, y):
///
/// ```text
/// z(x,y) = Σ(wi * zi) / Σ(wi)
/// where wi = 1 / d(x,y, xi,yi)^p
/// ```
///
/// With `p > 0`, a point lying exactly on a cell center gives the cell its
/// value (the mean value if several points coincide there). With `p = 0`
/// every weight is 1, so global IDW yields the plain mean everywhere.
///
/// # Errors
/// - [`Error::InsufficientData`] if the store is empty
/// - [`Error::InvalidParameter`] for a negative or non-finite power, or an
///   invalid search/grid setting
///
/// # Returns
/// Surface with interpolated values. Cells that end up with fewer than
/// `min_points` neighbours (or none within `max_radius`) are NaN.
pub fn idw(store: &PointStore, params: IdwParams) -> Result<Surface> {
    if store.is_empty() {
        return Err(Error::InsufficientData("no sample points to interpolate".into()));
    }
    if !(params.power.is_finite() && params.power >= 0.0) {
        return Err(Error::InvalidParameter {
            name: "power",
            value: params.power.to_string(),
            reason: "must be finite and >= 0".into(),
        });
    }
    params.search.validate()?;

    let spec = params.resolve_grid(store)?;
    let (rows, cols) = (spec.rows, spec.cols);
    let points = store.all();
    let search = params.search;
    let tree = search.is_limited().then(|| KdTree::build(points));
    let start = Instant::now();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut candidates: Vec<(f64, f64)> = Vec::new();

            for (col, cell) in row_data.iter_mut().enumerate() {
                let (cx, cy) = spec.cell_center(row, col);

                candidates.clear();
                match &tree {
                    None => candidates.extend(points.iter().map(|p| (p.dist_sq(cx, cy), p.value))),
                    Some(tree) => collect_neighbors(tree, &search, cx, cy, &mut candidates),
                }

                if candidates.is_empty() || candidates.len() < search.min_points {
                    continue; // NaN
                }

                *cell = weighted_mean(&candidates, params.power, search.smoothing);
            }

            row_data
        })
        .collect();

    debug!(
        rows,
        cols,
        points = points.len(),
        power = params.power,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "idw surface computed"
    );

    Surface::from_vec(spec, data)
}

/// Gather (squared distance, value) pairs for a cell from the tree
fn collect_neighbors(
    tree: &KdTree,
    search: &IdwSearch,
    cx: f64,
    cy: f64,
    out: &mut Vec<(f64, f64)>,
) {
    let found = match (search.max_points, search.max_radius) {
        (Some(k), radius) => {
            let limit = radius.map_or(f64::INFINITY, |r| r * r);
            tree.k_nearest(cx, cy, k)
                .into_iter()
                .filter(|n| n.distance_sq <= limit)
                .collect()
        }
        (None, Some(radius)) => tree.within_radius(cx, cy, radius),
        (None, None) => Vec::new(),
    };
    out.extend(found.iter().map(|n| (n.distance_sq, n.point.value)));
}

/// Shepard weighted mean of (squared distance, value) pairs
fn weighted_mean(candidates: &[(f64, f64)], power: f64, smoothing: f64) -> f64 {
    if power == 0.0 {
        return candidates.iter().map(|&(_, v)| v).sum::<f64>() / candidates.len() as f64;
    }

    let s2 = smoothing * smoothing;
    let half_power = power / 2.0;

    let mut sum_w = 0.0;
    let mut sum_wz = 0.0;
    let mut snap_sum = 0.0;
    let mut snap_count = 0usize;

    for &(dsq, val) in candidates {
        let w = 1.0 / (dsq + s2).powf(half_power);

        // Coincident point, or a distance so small the weight overflows
        if !w.is_finite() {
            snap_sum += val;
            snap_count += 1;
            continue;
        }

        sum_w += w;
        sum_wz += w * val;
    }

    if snap_count > 0 {
        snap_sum / snap_count as f64
    } else {
        sum_wz / sum_w
    }
}

/// Evaluate IDW at a single location using every point (global search).
///
/// Shares the weighting rules of [`idw`]; handy for checking a cell.
pub fn idw_at(points: &[SamplePoint], x: f64, y: f64, power: f64) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    let candidates: Vec<(f64, f64)> = points.iter().map(|p| (p.dist_sq(x, y), p.value)).collect();
    Some(weighted_mean(&candidates, power, 0.0))
}
