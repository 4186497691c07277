use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::models::geo::Coordinates;
use crate::services::cache::{CacheError, GeometryCache};

/// Unconditional delay applied before every live Nominatim request.
const GEOCODE_RATE_FLOOR: Duration = Duration::from_secs(1);

const USER_AGENT: &str = "map-poster-api";

/// Place-name to coordinate resolution.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, city: &str, country: &str) -> Result<Coordinates, GeocodeError>;
}

/// Nominatim-backed geocoder with read-through caching.
pub struct GeocoderClient {
    http: Client,
    base_url: String,
    cache: Arc<GeometryCache>,
}

#[derive(Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
}

impl GeocoderClient {
    pub fn new(base_url: &str, cache: Arc<GeometryCache>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        }
    }
}

#[async_trait]
impl Geocoder for GeocoderClient {
    /// Resolve a city/country pair to coordinates.
    ///
    /// Cache read failures propagate here (unlike the map-data adapter, a
    /// broken cache on this path is treated as fatal rather than degraded).
    async fn resolve(&self, city: &str, country: &str) -> Result<Coordinates, GeocodeError> {
        let key = format!("coords_{}_{}", city.to_lowercase(), country.to_lowercase());
        if let Some(coords) = self.cache.get::<Coordinates>(&key)? {
            tracing::debug!(city, country, "Geocoding cache hit");
            return Ok(coords);
        }

        tokio::time::sleep(GEOCODE_RATE_FLOOR).await;

        let hits: Vec<NominatimHit> = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", format!("{city}, {country}")),
                ("format", "json".to_string()),
                ("limit", "1".to_string()),
            ])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(GeocodeError::Http)?
            .error_for_status()
            .map_err(GeocodeError::Http)?
            .json()
            .await
            .map_err(GeocodeError::Http)?;

        let hit = hits
            .first()
            .ok_or_else(|| GeocodeError::NotFound(format!("{city}, {country}")))?;

        let coords = Coordinates {
            lat: hit
                .lat
                .parse()
                .map_err(|_| GeocodeError::Malformed(hit.lat.clone()))?,
            lon: hit
                .lon
                .parse()
                .map_err(|_| GeocodeError::Malformed(hit.lon.clone()))?,
        };

        // Cache writes are best-effort on this path.
        if let Err(e) = self.cache.put(&key, &coords) {
            tracing::warn!(error = %e, city, country, "Failed to cache geocoding result");
        }

        tracing::info!(city, country, lat = coords.lat, lon = coords.lon, "Geocoded place");
        Ok(coords)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not find coordinates for {0}")]
    NotFound(String),

    #[error("Geocoder returned a malformed coordinate: {0}")]
    Malformed(String),

    #[error("Geocoding cache unavailable: {0}")]
    Cache(#[from] CacheError),
}
