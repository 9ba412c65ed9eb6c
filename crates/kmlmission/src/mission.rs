//! Core mission types for kmlmission.
//!
//! A [`Mission`] is a named survey area whose boundary is a [`Polygon`]: an
//! ordered, non-empty ring of [`Vertex`] values taken verbatim from an
//! uploaded KML document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single WGS-84 point.
///
/// Latitude and longitude are not range-checked; values are stored exactly as
/// they appeared in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Altitude in metres; 0 when the source omits it.
    pub alt: f64,
}

impl Vertex {
    /// Create a vertex from latitude, longitude and altitude.
    #[must_use]
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }
}

/// An ordered, non-empty sequence of vertices.
///
/// Order is the boundary traversal order of the source document. An empty
/// polygon cannot be constructed, so anything holding a `Polygon` may be
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vertex>", into = "Vec<Vertex>")]
pub struct Polygon(Vec<Vertex>);

impl Polygon {
    /// Build a polygon from a vertex list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PolygonNotFound`] if `vertices` is empty.
    pub fn new(vertices: Vec<Vertex>) -> Result<Self> {
        if vertices.is_empty() {
            return Err(Error::PolygonNotFound);
        }
        Ok(Self(vertices))
    }

    /// The vertices in boundary order.
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.0
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the polygon, returning its vertices.
    #[must_use]
    pub fn into_vertices(self) -> Vec<Vertex> {
        self.0
    }
}

impl TryFrom<Vec<Vertex>> for Polygon {
    type Error = Error;

    fn try_from(vertices: Vec<Vertex>) -> Result<Self> {
        Self::new(vertices)
    }
}

impl From<Polygon> for Vec<Vertex> {
    fn from(polygon: Polygon) -> Self {
        polygon.0
    }
}

/// A persisted mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    /// Identifier assigned by the store.
    pub id: i64,

    /// Human-readable mission name.
    pub name: String,

    /// The survey boundary.
    pub polygon: Polygon,

    /// BLAKE3 hash of the source document, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,

    /// When the mission was created.
    pub created_at: DateTime<Utc>,
}

/// A mission as handed to the store, before an identifier is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMission {
    /// Human-readable mission name.
    pub name: String,
    /// The survey boundary.
    pub polygon: Polygon,
    /// BLAKE3 hash of the source document.
    pub source_hash: Option<String>,
}

impl NewMission {
    /// Create a new mission from a name and polygon.
    #[must_use]
    pub fn new(name: impl Into<String>, polygon: Polygon) -> Self {
        Self {
            name: name.into(),
            polygon,
            source_hash: None,
        }
    }

    /// Attach the hash of the document this mission was decoded from.
    #[must_use]
    pub fn with_source(mut self, document: &[u8]) -> Self {
        self.source_hash = Some(compute_hash(document));
        self
    }
}

/// Compute the BLAKE3 hash of a source document.
#[must_use]
pub fn compute_hash(document: &[u8]) -> String {
    blake3::hash(document).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vertices() -> Vec<Vertex> {
        vec![
            Vertex::new(28.98544, 77.09027, 150.5),
            Vertex::new(28.986, 77.091, 0.0),
            Vertex::new(28.987, 77.0905, 0.0),
        ]
    }

    #[test]
    fn test_polygon_rejects_empty() {
        let result = Polygon::new(Vec::new());
        assert!(matches!(result, Err(Error::PolygonNotFound)));
    }

    #[test]
    fn test_polygon_preserves_order() {
        let vertices = sample_vertices();
        let polygon = Polygon::new(vertices.clone()).unwrap();
        assert_eq!(polygon.len(), 3);
        assert!(!polygon.is_empty());
        assert_eq!(polygon.vertices(), vertices.as_slice());
        assert_eq!(polygon.into_vertices(), vertices);
    }

    #[test]
    fn test_polygon_serializes_as_array() {
        let polygon = Polygon::new(vec![Vertex::new(1.5, 2.5, 0.0)]).unwrap();
        let json = serde_json::to_string(&polygon).unwrap();
        assert_eq!(json, r#"[{"lat":1.5,"lon":2.5,"alt":0.0}]"#);
    }

    #[test]
    fn test_polygon_deserialize_rejects_empty() {
        let result: std::result::Result<Polygon, _> = serde_json::from_str("[]");
        assert!(result.is_err());
    }

    #[test]
    fn test_polygon_json_values_exact() {
        let polygon = Polygon::new(sample_vertices()).unwrap();
        let json = serde_json::to_string(&polygon).unwrap();
        let back: Polygon = serde_json::from_str(&json).unwrap();
        assert_eq!(back, polygon);
    }

    #[test]
    fn test_new_mission_with_source() {
        let polygon = Polygon::new(sample_vertices()).unwrap();
        let mission = NewMission::new("Survey", polygon).with_source(b"<kml/>");
        assert_eq!(mission.name, "Survey");
        assert_eq!(mission.source_hash, Some(compute_hash(b"<kml/>")));
    }

    #[test]
    fn test_compute_hash_deterministic() {
        assert_eq!(compute_hash(b"abc"), compute_hash(b"abc"));
        assert_ne!(compute_hash(b"abc"), compute_hash(b"abd"));
        assert_eq!(compute_hash(b"abc").len(), 64);
    }
}
