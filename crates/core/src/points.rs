//! Sample points and the point store

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::Extent;

/// A sample point with x, y coordinates and a value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    /// Squared Euclidean distance to another point
    #[inline]
    pub fn dist_sq(&self, other_x: f64, other_y: f64) -> f64 {
        let dx = self.x - other_x;
        let dy = self.y - other_y;
        dx * dx + dy * dy
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.value.is_finite()
    }
}

/// Validated, immutable collection of sample points.
///
/// Point order is kept as loaded but carries no meaning.
#[derive(Debug, Clone, Default)]
pub struct PointStore {
    points: Vec<SamplePoint>,
}

impl PointStore {
    /// Load points, rejecting any non-finite coordinate or value.
    ///
    /// An empty set is accepted here; interpolation is what requires data.
    pub fn load(points: impl Into<Vec<SamplePoint>>) -> Result<Self> {
        let points = points.into();

        if let Some((index, p)) = points.iter().enumerate().find(|(_, p)| !p.is_finite()) {
            return Err(Error::InvalidPoint {
                index,
                x: p.x,
                y: p.y,
                value: p.value,
            });
        }

        Ok(Self { points })
    }

    pub fn all(&self) -> &[SamplePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounding rectangle of the points, `None` when empty
    pub fn extent(&self) -> Option<Extent> {
        Extent::enclosing(self.points.iter().map(|p| (p.x, p.y)))
    }

    /// Arithmetic mean of the point values, `None` when empty
    pub fn mean_value(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        Some(self.points.iter().map(|p| p.value).sum::<f64>() / self.points.len() as f64)
    }
}
