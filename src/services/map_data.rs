use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::geo::{Coordinates, FeatureCollection, FeaturePolygon, StreetEdge, StreetNetwork};
use crate::services::cache::GeometryCache;

/// Rate-limit floors applied before live Overpass requests.
const NETWORK_RATE_FLOOR: Duration = Duration::from_millis(500);
const FEATURE_RATE_FLOOR: Duration = Duration::from_millis(300);

/// An OSM tag filter: each clause matches one tag key against a value set.
#[derive(Debug, Clone)]
pub struct TagClause {
    pub key: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TagFilter {
    pub clauses: Vec<TagClause>,
}

impl TagFilter {
    pub fn new(clauses: &[(&str, &[&str])]) -> Self {
        Self {
            clauses: clauses
                .iter()
                .map(|(key, values)| TagClause {
                    key: key.to_string(),
                    values: values.iter().map(|v| v.to_string()).collect(),
                })
                .collect(),
        }
    }

    /// Water areas: natural water/bay/strait plus riverbanks.
    pub fn water() -> Self {
        Self::new(&[("natural", &["water", "bay", "strait"]), ("waterway", &["riverbank"])])
    }

    /// Green areas: parks and grass landuse.
    pub fn parks() -> Self {
        Self::new(&[("leisure", &["park"]), ("landuse", &["grass"])])
    }

    /// Tag keys joined for use in cache keys.
    pub fn key_signature(&self) -> String {
        self.clauses
            .iter()
            .map(|c| c.key.as_str())
            .collect::<Vec<_>>()
            .join("_")
    }

    fn overpass_selectors(&self, point: Coordinates, radius: u32) -> String {
        self.clauses
            .iter()
            .map(|c| {
                let filter = if c.values.len() == 1 {
                    format!("[\"{}\"=\"{}\"]", c.key, c.values[0])
                } else {
                    format!("[\"{}\"~\"^({})$\"]", c.key, c.values.join("|"))
                };
                format!("way(around:{},{},{}){};", radius, point.lat, point.lon, filter)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Source of street networks and area feature layers.
///
/// Both operations degrade to `None` on any upstream failure; absence is an
/// expected outcome the renderer handles per layer.
#[async_trait]
pub trait MapDataProvider: Send + Sync {
    async fn fetch_network(&self, point: Coordinates, radius: u32) -> Option<StreetNetwork>;

    async fn fetch_features(
        &self,
        point: Coordinates,
        radius: u32,
        tags: &TagFilter,
        layer: &str,
    ) -> Option<FeatureCollection>;
}

/// Overpass-backed map data source with read-through caching.
pub struct OverpassClient {
    http: Client,
    endpoint: String,
    cache: Arc<GeometryCache>,
}

#[derive(Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Deserialize)]
struct OverpassElement {
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    geometry: Vec<OverpassPoint>,
}

#[derive(Deserialize)]
struct OverpassPoint {
    lat: f64,
    lon: f64,
}

impl OverpassClient {
    pub fn new(endpoint: &str, cache: Arc<GeometryCache>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.to_string(),
            cache,
        }
    }

    async fn query(&self, body: String) -> Result<OverpassResponse, reqwest::Error> {
        self.http
            .post(&self.endpoint)
            .form(&[("data", body)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl MapDataProvider for OverpassClient {
    async fn fetch_network(&self, point: Coordinates, radius: u32) -> Option<StreetNetwork> {
        let key = format!("graph_{}_{}_{}", point.lat, point.lon, radius);

        // A broken cache on this path degrades to a cold miss.
        match self.cache.get::<StreetNetwork>(&key) {
            Ok(Some(network)) => return Some(network),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, key, "Street network cache read failed, fetching live"),
        }

        tokio::time::sleep(NETWORK_RATE_FLOOR).await;

        let query = format!(
            "[out:json][timeout:60];\nway(around:{},{},{})[\"highway\"];\nout geom;",
            radius, point.lat, point.lon
        );

        let response = match self.query(query).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, lat = point.lat, lon = point.lon, "Street network fetch failed");
                return None;
            }
        };

        let edges: Vec<StreetEdge> = response
            .elements
            .into_iter()
            .filter(|el| el.geometry.len() >= 2)
            .map(|el| StreetEdge {
                points: el.geometry.iter().map(|p| Coordinates { lat: p.lat, lon: p.lon }).collect(),
                highway: el
                    .tags
                    .get("highway")
                    .map(|h| h.split(';').map(str::to_string).collect())
                    .unwrap_or_default(),
            })
            .collect();

        let network = StreetNetwork { edges };
        if network.is_empty() {
            tracing::warn!(lat = point.lat, lon = point.lon, radius, "Street network query returned no edges");
            return None;
        }

        if let Err(e) = self.cache.put(&key, &network) {
            tracing::warn!(error = %e, key, "Failed to cache street network");
        }

        tracing::info!(edges = network.edges.len(), radius, "Fetched street network");
        Some(network)
    }

    async fn fetch_features(
        &self,
        point: Coordinates,
        radius: u32,
        tags: &TagFilter,
        layer: &str,
    ) -> Option<FeatureCollection> {
        let key = format!(
            "{}_{}_{}_{}_{}",
            layer,
            point.lat,
            point.lon,
            radius,
            tags.key_signature()
        );

        match self.cache.get::<FeatureCollection>(&key) {
            Ok(Some(features)) => return Some(features),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, key, "Feature cache read failed, fetching live"),
        }

        tokio::time::sleep(FEATURE_RATE_FLOOR).await;

        let query = format!(
            "[out:json][timeout:60];\n(\n{}\n);\nout geom;",
            tags.overpass_selectors(point, radius)
        );

        let response = match self.query(query).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, layer, "Feature fetch failed, layer will be skipped");
                return None;
            }
        };

        let polygons: Vec<FeaturePolygon> = response
            .elements
            .into_iter()
            .filter(|el| el.geometry.len() >= 3)
            .map(|el| {
                let mut exterior: Vec<Coordinates> = el
                    .geometry
                    .iter()
                    .map(|p| Coordinates { lat: p.lat, lon: p.lon })
                    .collect();
                // Overpass ways are not always explicitly closed.
                if exterior.first() != exterior.last() {
                    if let Some(&first) = exterior.first() {
                        exterior.push(first);
                    }
                }
                FeaturePolygon { exterior }
            })
            .collect();

        let features = FeatureCollection { polygons };

        if let Err(e) = self.cache.put(&key, &features) {
            tracing::warn!(error = %e, key, "Failed to cache feature layer");
        }

        tracing::info!(layer, polygons = features.polygons.len(), "Fetched feature layer");
        Some(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_signature_preserves_clause_order() {
        assert_eq!(TagFilter::water().key_signature(), "natural_waterway");
        assert_eq!(TagFilter::parks().key_signature(), "leisure_landuse");
    }

    #[test]
    fn test_overpass_selectors_single_and_multi_value() {
        let point = Coordinates { lat: 48.0, lon: 2.0 };
        let selectors = TagFilter::water().overpass_selectors(point, 5000);
        assert!(selectors.contains("[\"natural\"~\"^(water|bay|strait)$\"]"));
        assert!(selectors.contains("[\"waterway\"=\"riverbank\"]"));
        assert!(selectors.contains("around:5000,48,2"));
    }
}
