//! JSON input documents

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use zonalreg_core::{SamplePoint, Zone};

/// On-disk shape of an input file:
///
/// ```json
/// {
///   "points": [{"x": 0.0, "y": 0.0, "value": 3.2}],
///   "zones": [{"id": "55025", "vertices": [[0, 0], [1, 0], [1, 1]], "response": 0.41}]
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InputDocument {
    points: Vec<SamplePoint>,
    zones: Vec<ZoneRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ZoneRecord {
    id: String,
    vertices: Vec<[f64; 2]>,
    #[serde(default)]
    holes: Vec<Vec<[f64; 2]>>,
    response: f64,
}

/// Points and zones read from an input file
#[derive(Debug)]
pub struct Dataset {
    pub points: Vec<SamplePoint>,
    pub zones: Vec<Zone>,
}

pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_dataset(&text).with_context(|| format!("Invalid input file {}", path.display()))
}

fn parse_dataset(text: &str) -> Result<Dataset> {
    let doc: InputDocument = serde_json::from_str(text).context("Malformed JSON document")?;

    let zones = doc
        .zones
        .into_iter()
        .map(into_zone)
        .collect::<Result<Vec<_>>>()?;

    Ok(Dataset {
        points: doc.points,
        zones,
    })
}

fn into_zone(record: ZoneRecord) -> Result<Zone> {
    let ring = |coords: Vec<[f64; 2]>| -> Vec<(f64, f64)> { coords.into_iter().map(|[x, y]| (x, y)).collect() };

    if distinct_vertices(&record.vertices) < 3 {
        bail!("Zone {}: a ring needs at least 3 distinct vertices", record.id);
    }
    if let Some(i) = record.holes.iter().position(|h| distinct_vertices(h) < 3) {
        bail!("Zone {}: hole #{} has fewer than 3 distinct vertices", record.id, i);
    }

    let holes = record.holes.into_iter().map(ring).collect();
    Ok(Zone::with_holes(record.id, ring(record.vertices), holes, record.response))
}

/// Number of distinct positions in a ring
fn distinct_vertices(coords: &[[f64; 2]]) -> usize {
    coords
        .iter()
        .map(|[x, y]| ((x + 0.0).to_bits(), (y + 0.0).to_bits()))
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let text = r#"{
            "points": [{"x": 0.0, "y": 0.0, "value": 1.5}, {"x": 2.0, "y": 1.0, "value": 4.0}],
            "zones": [
                {"id": "a", "vertices": [[0, 0], [1, 0], [1, 1], [0, 1]], "response": 0.3},
                {"id": "b", "vertices": [[0, 0], [4, 0], [4, 4], [0, 0]],
                 "holes": [[[1, 1], [2, 1], [1, 2]]], "response": 0.7}
            ]
        }"#;

        let data = parse_dataset(text).unwrap();
        assert_eq!(data.points.len(), 2);
        assert_eq!(data.points[1], SamplePoint::new(2.0, 1.0, 4.0));
        assert_eq!(data.zones.len(), 2);
        assert_eq!(data.zones[0].id, "a");
        assert_eq!(data.zones[1].polygon.interiors().len(), 1);
        assert_eq!(data.zones[1].response, 0.7);
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let text = r#"{"points": [], "zones": [{"id": "x", "vertices": [[0, 0], [1, 1], [0, 0]], "response": 1}]}"#;
        let err = parse_dataset(text).unwrap_err();
        assert!(err.to_string().contains("Zone x"));
    }

    #[test]
    fn test_repeated_vertices_do_not_count() {
        let text = r#"{"points": [], "zones": [{"id": "y", "vertices": [[0, 0], [0, 0], [0, 0], [1, 1]], "response": 1}]}"#;
        assert!(parse_dataset(text).is_err());

        let hole = r#"{"points": [], "zones": [{"id": "z", "vertices": [[0, 0], [4, 0], [4, 4]],
            "holes": [[[1, 1], [2, 2], [1, 1], [2, 2]]], "response": 1}]}"#;
        let err = parse_dataset(hole).unwrap_err();
        assert!(err.to_string().contains("hole #0"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let text = r#"{"points": [], "zones": [], "power": 2}"#;
        assert!(parse_dataset(text).is_err());
    }
}
