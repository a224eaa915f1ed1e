//! Interpolate → aggregate → regress pipeline
//!
//! Grids the sample points with IDW, averages the surface over every zone,
//! regresses the zone responses on those averages and attaches residuals
//! back to the zones by id.
//!
//! [`run`] is the one-shot entry point. [`Pipeline`] keeps validated inputs
//! and a [`SurfaceCache`] so that repeated runs (a power sweep, or a
//! different touch mode) only regrid when the interpolation settings change.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;
use zonalreg_core::raster::{SurfaceStatistics, DEFAULT_MARGIN_FRACTION, DEFAULT_MAX_CELLS};
use zonalreg_core::{Error, GridSpec, PointStore, Result, SamplePoint, Stage, Surface, Zone, ZoneSet};

use crate::interpolation::{idw, IdwParams, IdwSearch};
use crate::statistics::ols::{self, OlsFit};
use crate::statistics::zonal::{zonal_means, TouchMode};

/// Accepted range of the IDW power
pub const POWER_RANGE: RangeInclusive<f64> = 0.0..=4.0;

/// Settings for one pipeline run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// IDW power, within [`POWER_RANGE`] (default: 1.0)
    pub power: f64,
    /// Cell selection rule for zonal means (default: all touched)
    pub touch_mode: TouchMode,
    /// Output grid. `None` derives one from the point extent.
    pub grid: Option<GridSpec>,
    /// Cells along the longer axis of a derived grid
    pub max_cells: usize,
    /// Margin of a derived grid, as a fraction of the larger span
    pub margin_fraction: f64,
    /// IDW neighbour search
    pub search: IdwSearch,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            power: 1.0,
            touch_mode: TouchMode::AllTouched,
            grid: None,
            max_cells: DEFAULT_MAX_CELLS,
            margin_fraction: DEFAULT_MARGIN_FRACTION,
            search: IdwSearch::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_power(self, power: f64) -> Self {
        Self { power, ..self }
    }

    /// IDW parameters for this run
    pub fn idw_params(&self) -> IdwParams {
        IdwParams {
            power: self.power,
            grid: self.grid,
            max_cells: self.max_cells,
            margin_fraction: self.margin_fraction,
            search: self.search,
        }
    }

    fn validate_power(&self) -> Result<()> {
        if POWER_RANGE.contains(&self.power) {
            Ok(())
        } else {
            Err(Error::InvalidParameter {
                name: "power",
                value: self.power.to_string(),
                reason: format!("must be within [{}, {}]", POWER_RANGE.start(), POWER_RANGE.end()),
            })
        }
    }
}

/// One zone of the final table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedZone {
    pub zone_id: String,
    pub response: f64,
    /// Zonal mean of the surface (the regression predictor)
    pub mean_value: f64,
    /// Cells averaged into `mean_value`
    pub cell_count: usize,
    pub residual: f64,
    pub standardized_residual: f64,
}

/// Result of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    /// Power the surface was computed with
    pub power: f64,
    /// Zones that overlapped the grid, in input order
    pub zones: Vec<AnnotatedZone>,
    /// Fit of response on zonal mean over `zones`
    pub regression: OlsFit,
    /// Ids of zones dropped because no valid cell overlapped them
    pub unmatched: Vec<String>,
    /// Grid the surface was computed on
    pub grid: GridSpec,
    /// Value range and empty cells of the surface
    pub surface: SurfaceStatistics,
}

impl PipelineOutput {
    pub fn zone(&self, id: &str) -> Option<&AnnotatedZone> {
        self.zones.iter().find(|z| z.zone_id == id)
    }
}

/// Run the whole pipeline once.
///
/// # Errors
/// Any failure is returned as [`Error::Stage`] naming the stage:
/// - `load-points`: a non-finite point
/// - `interpolate`: no points, power outside [`POWER_RANGE`], bad grid or search
/// - `aggregate`: duplicate zone ids
/// - `regress`: fewer than 2 matched zones, a non-finite response, or
///   identical zonal means everywhere (e.g. power 0)
pub fn run(
    points: impl Into<Vec<SamplePoint>>,
    zones: impl Into<Vec<Zone>>,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    Pipeline::new(points, zones)?.run(config)
}

/// Key of a cached surface: everything the IDW result depends on besides
/// the points themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SurfaceKey {
    power: u64,
    grid: Option<[u64; 6]>,
    max_cells: usize,
    margin_fraction: u64,
    smoothing: u64,
    max_radius: Option<u64>,
    max_points: Option<usize>,
    min_points: usize,
}

/// Bit pattern of a float with -0.0 folded into 0.0
fn bits(v: f64) -> u64 {
    (v + 0.0).to_bits()
}

impl SurfaceKey {
    fn new(params: &IdwParams) -> Self {
        Self {
            power: bits(params.power),
            grid: params.grid.map(|g| {
                [
                    bits(g.origin_x),
                    bits(g.origin_y),
                    bits(g.cell_width),
                    bits(g.cell_height),
                    g.cols as u64,
                    g.rows as u64,
                ]
            }),
            // a fixed grid ignores the derivation settings
            max_cells: if params.grid.is_some() { 0 } else { params.max_cells },
            margin_fraction: if params.grid.is_some() { 0 } else { bits(params.margin_fraction) },
            smoothing: bits(params.search.smoothing),
            max_radius: params.search.max_radius.map(bits),
            max_points: params.search.max_points,
            min_points: params.search.min_points,
        }
    }
}

/// Surfaces computed for one point set, keyed by interpolation settings
#[derive(Debug, Default)]
pub struct SurfaceCache {
    surfaces: HashMap<SurfaceKey, Surface>,
    hits: usize,
    misses: usize,
}

impl SurfaceCache {
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.surfaces.clear();
    }

    fn get_or_compute(&mut self, params: &IdwParams, compute: impl FnOnce() -> Result<Surface>) -> Result<&Surface> {
        match self.surfaces.entry(SurfaceKey::new(params)) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                debug!(power = params.power, "surface cache hit");
                Ok(&*entry.into_mut())
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                Ok(&*entry.insert(compute()?))
            }
        }
    }
}

/// Validated inputs plus cached surfaces
#[derive(Debug)]
pub struct Pipeline {
    store: PointStore,
    zones: ZoneSet,
    cache: SurfaceCache,
}

impl Pipeline {
    /// Validate points and zones.
    ///
    /// An empty point set is accepted here and rejected when interpolating.
    pub fn new(points: impl Into<Vec<SamplePoint>>, zones: impl Into<Vec<Zone>>) -> Result<Self> {
        let store = PointStore::load(points).map_err(|e| e.in_stage(Stage::LoadPoints))?;
        let zones = ZoneSet::new(zones).map_err(|e| e.in_stage(Stage::Aggregate))?;
        Ok(Self {
            store,
            zones,
            cache: SurfaceCache::default(),
        })
    }

    pub fn points(&self) -> &PointStore {
        &self.store
    }

    pub fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    pub fn cache(&self) -> &SurfaceCache {
        &self.cache
    }

    /// Interpolated surface for `config`, computed on a cache miss
    pub fn surface(&mut self, config: &PipelineConfig) -> Result<&Surface> {
        cached_surface(&mut self.cache, &self.store, config)
    }

    /// Run the pipeline with `config`, reusing a cached surface if the
    /// interpolation settings were seen before.
    pub fn run(&mut self, config: &PipelineConfig) -> Result<PipelineOutput> {
        let start = Instant::now();
        let surface = cached_surface(&mut self.cache, &self.store, config)?;
        let output = analyze(surface, &self.zones, config)?;

        debug!(
            power = config.power,
            zones = output.zones.len(),
            unmatched = output.unmatched.len(),
            r_squared = output.regression.r_squared,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pipeline run complete"
        );

        Ok(output)
    }

    /// Run once per power, all other settings from `config`.
    ///
    /// Each power gets its own result, so one failing power (power 0 makes
    /// every zonal mean equal) does not hide the others.
    pub fn sweep(&mut self, config: &PipelineConfig, powers: &[f64]) -> Vec<(f64, Result<PipelineOutput>)> {
        powers
            .iter()
            .map(|&power| (power, self.run(&config.with_power(power))))
            .collect()
    }
}

fn cached_surface<'a>(
    cache: &'a mut SurfaceCache,
    store: &PointStore,
    config: &PipelineConfig,
) -> Result<&'a Surface> {
    config.validate_power().map_err(|e| e.in_stage(Stage::Interpolate))?;

    let params = config.idw_params();
    cache
        .get_or_compute(&params, || idw(store, params))
        .map_err(|e| e.in_stage(Stage::Interpolate))
}

/// Steps after interpolation: aggregate, drop unmatched, fit, join by id
fn analyze(surface: &Surface, zones: &ZoneSet, config: &PipelineConfig) -> Result<PipelineOutput> {
    let start = Instant::now();
    let aggregates = zonal_means(surface, zones.as_slice(), config.touch_mode);
    debug!(
        zones = aggregates.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "zonal means computed"
    );

    let mut matched = Vec::with_capacity(aggregates.len());
    let mut unmatched = Vec::new();
    for (zone, aggregate) in zones.iter().zip(&aggregates) {
        match aggregate.mean {
            Some(mean) => matched.push((zone, mean, aggregate.cell_count)),
            None => unmatched.push(zone.id.clone()),
        }
    }

    let predictor: Vec<f64> = matched.iter().map(|(_, mean, _)| *mean).collect();
    let response: Vec<f64> = matched.iter().map(|(zone, _, _)| zone.response).collect();
    let regression = ols::fit(&predictor, &response).map_err(|e| e.in_stage(Stage::Regress))?;

    let residuals: HashMap<&str, f64> = matched
        .iter()
        .zip(&regression.residuals)
        .map(|((zone, _, _), &r)| (zone.id.as_str(), r))
        .collect();

    let annotated = matched
        .iter()
        .map(|&(zone, mean_value, cell_count)| {
            let residual = residuals.get(zone.id.as_str()).copied().unwrap_or(f64::NAN);
            AnnotatedZone {
                zone_id: zone.id.clone(),
                response: zone.response,
                mean_value,
                cell_count,
                residual,
                standardized_residual: regression.standardize(residual),
            }
        })
        .collect();

    Ok(PipelineOutput {
        power: config.power,
        zones: annotated,
        regression,
        unmatched,
        grid: *surface.spec(),
        surface: surface.statistics(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Values rise with x: v = 10 x
    fn ramp_points() -> Vec<SamplePoint> {
        let mut points = Vec::new();
        for i in 0..=4 {
            for j in 0..=4 {
                let (x, y) = (i as f64, j as f64);
                points.push(SamplePoint::new(x, y, 10.0 * x));
            }
        }
        points
    }

    fn square(id: &str, x0: f64, y0: f64, size: f64, response: f64) -> Zone {
        Zone::new(
            id,
            vec![(x0, y0), (x0 + size, y0), (x0 + size, y0 + size), (x0, y0 + size)],
            response,
        )
    }

    fn strip_zones() -> Vec<Zone> {
        vec![
            square("west", 0.0, 1.0, 1.0, 3.0),
            square("middle", 1.5, 1.0, 1.0, 5.5),
            square("east", 3.0, 1.0, 1.0, 6.0),
        ]
    }

    fn small_grid() -> PipelineConfig {
        PipelineConfig {
            max_cells: 40,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.power, 1.0);
        assert_eq!(config.touch_mode, TouchMode::AllTouched);
        assert!(config.grid.is_none());
    }

    #[test]
    fn test_run_annotates_by_id() {
        let output = run(ramp_points(), strip_zones(), &small_grid()).unwrap();

        assert_eq!(output.zones.len(), 3);
        assert!(output.unmatched.is_empty());

        let ids: Vec<&str> = output.zones.iter().map(|z| z.zone_id.as_str()).collect();
        assert_eq!(ids, vec!["west", "middle", "east"]);

        let west = output.zone("west").unwrap();
        let east = output.zone("east").unwrap();
        assert!(west.mean_value < east.mean_value);
        assert!(output.regression.slope > 0.0);

        for (z, r) in output.zones.iter().zip(&output.regression.residuals) {
            assert_eq!(z.residual, *r);
            assert_relative_eq!(z.response - output.regression.predict(z.mean_value), z.residual, epsilon = 1e-9);
            assert_relative_eq!(z.standardized_residual, z.residual / output.regression.std_y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unmatched_zone_dropped() {
        let mut zones = strip_zones();
        zones.insert(1, square("offshore", 100.0, 100.0, 1.0, 9.0));

        let output = run(ramp_points(), zones, &small_grid()).unwrap();
        assert_eq!(output.unmatched, vec!["offshore".to_string()]);
        assert_eq!(output.zones.len(), 3);
        assert!(output.zone("offshore").is_none());
        assert_eq!(output.regression.n_samples, 3);
    }

    #[test]
    fn test_stage_errors() {
        let bad = vec![SamplePoint::new(0.0, f64::NAN, 1.0)];
        let err = run(bad, strip_zones(), &small_grid()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::LoadPoints));
        assert!(matches!(err.root(), Error::InvalidPoint { index: 0, .. }));

        let err = run(Vec::new(), strip_zones(), &small_grid()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Interpolate));
        assert!(matches!(err.root(), Error::InsufficientData(_)));

        let err = run(ramp_points(), strip_zones(), &small_grid().with_power(4.5)).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Interpolate));
        assert!(matches!(err.root(), Error::InvalidParameter { name: "power", .. }));

        let dup = vec![square("a", 0.0, 0.0, 1.0, 1.0), square("a", 2.0, 0.0, 1.0, 2.0)];
        let err = run(ramp_points(), dup, &small_grid()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Aggregate));

        let one = vec![square("only", 0.0, 0.0, 1.0, 1.0)];
        let err = run(ramp_points(), one, &small_grid()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Regress));
        assert!(matches!(err.root(), Error::InsufficientSamples { needed: 2, got: 1 }));
    }

    #[test]
    fn test_power_zero_is_singular() {
        let err = run(ramp_points(), strip_zones(), &small_grid().with_power(0.0)).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Regress));
        assert!(matches!(err.root(), Error::SingularDesign(_)));
    }

    #[test]
    fn test_power_zero_is_singular_with_inexact_mean() {
        // Mean 0.1 is not representable; zones of different sizes sum it
        // over different cell counts
        let points = vec![
            SamplePoint::new(0.0, 0.0, 0.0),
            SamplePoint::new(10.0, 0.0, 0.2),
            SamplePoint::new(0.0, 10.0, 0.0),
            SamplePoint::new(10.0, 10.0, 0.2),
        ];
        let zones = vec![
            square("a", 0.0, 0.0, 1.3, 1.0),
            square("b", 2.0, 2.0, 3.7, 2.0),
            square("c", 1.0, 6.0, 2.9, 3.0),
            square("d", 0.0, 0.0, 10.0, 4.0),
        ];
        let config = PipelineConfig {
            max_cells: 37,
            ..PipelineConfig::default()
        };

        let err = run(points, zones, &config.with_power(0.0)).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Regress));
        assert!(matches!(err.root(), Error::SingularDesign(_)));
    }

    #[test]
    fn test_cache_reuses_surface() {
        let mut pipeline = Pipeline::new(ramp_points(), strip_zones()).unwrap();
        let config = small_grid();

        let first = pipeline.run(&config).unwrap();
        let second = pipeline.run(&PipelineConfig {
            touch_mode: TouchMode::Center,
            ..config
        });
        assert!(second.is_ok());
        let third = pipeline.run(&config).unwrap();

        assert_eq!(pipeline.cache().misses(), 1);
        assert_eq!(pipeline.cache().hits(), 2);
        assert_eq!(first, third);
        assert_eq!(first.surface.valid_count, first.grid.len());
        assert_eq!(first.surface.nodata_count, 0);

        pipeline.run(&config.with_power(2.0)).unwrap();
        assert_eq!(pipeline.cache().misses(), 2);
        assert_eq!(pipeline.cache().len(), 2);
    }

    #[test]
    fn test_negative_zero_shares_cache_entry() {
        let params = PipelineConfig::default().idw_params();
        let negated = IdwParams { power: -0.0, ..params };
        let zero = IdwParams { power: 0.0, ..params };
        assert_eq!(SurfaceKey::new(&negated), SurfaceKey::new(&zero));
    }

    #[test]
    fn test_sweep_reports_each_power() {
        let mut pipeline = Pipeline::new(ramp_points(), strip_zones()).unwrap();
        let results = pipeline.sweep(&small_grid(), &[0.0, 1.0, 2.0, 1.0]);

        assert_eq!(results.len(), 4);
        assert!(results[0].1.is_err());
        assert!(results[1].1.is_ok() && results[2].1.is_ok());
        assert_eq!(results[1].1.as_ref().unwrap(), results[3].1.as_ref().unwrap());
        assert_eq!(pipeline.cache().misses(), 3);
    }

    #[test]
    fn test_surface_accessor_validates_power() {
        let mut pipeline = Pipeline::new(ramp_points(), strip_zones()).unwrap();
        assert!(pipeline.surface(&small_grid().with_power(-1.0)).is_err());
        let surface = pipeline.surface(&small_grid()).unwrap();
        assert_eq!(surface.cols(), 40);
    }
}
