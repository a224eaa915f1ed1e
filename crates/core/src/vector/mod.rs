//! Polygon zones carrying a response value

use geo::BoundingRect;
use geo_types::{LineString, Polygon};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::raster::Extent;

/// A polygon region with an externally observed response (e.g. a rate).
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    /// Identifier, unique within a [`ZoneSet`]
    pub id: String,
    /// Zone boundary. Rings are closed; holes are allowed.
    pub polygon: Polygon<f64>,
    /// Observed response for this zone
    pub response: f64,
}

impl Zone {
    /// Create a zone from an exterior ring given as (x, y) vertices.
    ///
    /// The ring is closed automatically. Self-intersecting rings are not
    /// detected; results for them are unspecified.
    pub fn new(id: impl Into<String>, vertices: Vec<(f64, f64)>, response: f64) -> Self {
        Self {
            id: id.into(),
            polygon: Polygon::new(LineString::from(vertices), vec![]),
            response,
        }
    }

    /// Create a zone from an exterior ring and interior rings (holes)
    pub fn with_holes(
        id: impl Into<String>,
        vertices: Vec<(f64, f64)>,
        holes: Vec<Vec<(f64, f64)>>,
        response: f64,
    ) -> Self {
        let interiors = holes.into_iter().map(LineString::from).collect();
        Self {
            id: id.into(),
            polygon: Polygon::new(LineString::from(vertices), interiors),
            response,
        }
    }

    /// Bounding rectangle, `None` for a polygon without vertices
    pub fn extent(&self) -> Option<Extent> {
        self.polygon
            .bounding_rect()
            .map(|r| Extent::new(r.min().x, r.min().y, r.max().x, r.max().y))
    }
}

/// Ordered collection of zones with unique ids
#[derive(Debug, Clone, Default)]
pub struct ZoneSet {
    zones: Vec<Zone>,
}

impl ZoneSet {
    /// Build a zone set, rejecting duplicate ids
    pub fn new(zones: impl Into<Vec<Zone>>) -> Result<Self> {
        let zones = zones.into();

        let mut seen = HashSet::with_capacity(zones.len());
        for zone in &zones {
            if !seen.insert(zone.id.as_str()) {
                return Err(Error::DuplicateZoneId(zone.id.clone()));
            }
        }

        Ok(Self { zones })
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    pub fn as_slice(&self) -> &[Zone] {
        &self.zones
    }

    pub fn get(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Bounding rectangle of all zones
    pub fn extent(&self) -> Option<Extent> {
        self.zones
            .iter()
            .filter_map(Zone::extent)
            .reduce(|a, b| a.union(&b))
    }
}
