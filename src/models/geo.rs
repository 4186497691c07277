use serde::{Deserialize, Serialize};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// One drawable road segment with its raw OSM highway tag values.
///
/// OSM allows multi-valued tags; classification collapses the list to its
/// first element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetEdge {
    pub points: Vec<Coordinates>,
    pub highway: Vec<String>,
}

/// A street network flattened to drawable edges.
///
/// This is the cache payload schema for the `graph_*` key namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreetNetwork {
    pub edges: Vec<StreetEdge>,
}

impl StreetNetwork {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// A closed area geometry (exterior ring only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePolygon {
    pub exterior: Vec<Coordinates>,
}

/// A named feature layer (water, parks) as a set of area geometries.
///
/// Cache payload schema for the `{layer}_*` key namespaces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub polygons: Vec<FeaturePolygon>,
}
