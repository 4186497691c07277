//! Shared test doubles for exercising the job pipeline without network
//! access: a fixed geocoder and synthetic map data providers.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use map_poster_api::models::geo::{
    Coordinates, FeatureCollection, FeaturePolygon, StreetEdge, StreetNetwork,
};
use map_poster_api::services::geocoder::{GeocodeError, Geocoder};
use map_poster_api::services::map_data::{MapDataProvider, TagFilter};
use map_poster_api::services::pipeline::PosterPipeline;
use map_poster_api::services::renderer::CanvasSize;
use map_poster_api::services::themes::ThemeStore;

pub const PARIS: Coordinates = Coordinates { lat: 48.8566, lon: 2.3522 };

/// Geocoder that always resolves to one coordinate pair.
pub struct FixedGeocoder(pub Coordinates);

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn resolve(&self, _city: &str, _country: &str) -> Result<Coordinates, GeocodeError> {
        Ok(self.0)
    }
}

/// Map data provider serving a synthetic street grid plus one water polygon,
/// counting network fetches so tests can assert at-most-once consumption.
pub struct SyntheticMapData {
    pub network_calls: AtomicUsize,
}

impl SyntheticMapData {
    pub fn new() -> Self {
        Self { network_calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }

    pub fn grid(center: Coordinates) -> StreetNetwork {
        let mut edges = Vec::new();
        for i in -4i32..=4 {
            let offset = i as f64 * 0.002;
            edges.push(StreetEdge {
                points: vec![
                    Coordinates { lat: center.lat + offset, lon: center.lon - 0.01 },
                    Coordinates { lat: center.lat + offset, lon: center.lon + 0.01 },
                ],
                highway: vec!["residential".to_string()],
            });
            edges.push(StreetEdge {
                points: vec![
                    Coordinates { lat: center.lat - 0.01, lon: center.lon + offset },
                    Coordinates { lat: center.lat + 0.01, lon: center.lon + offset },
                ],
                highway: vec!["secondary".to_string()],
            });
        }
        StreetNetwork { edges }
    }
}

#[async_trait]
impl MapDataProvider for SyntheticMapData {
    async fn fetch_network(&self, point: Coordinates, _radius: u32) -> Option<StreetNetwork> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        Some(Self::grid(point))
    }

    async fn fetch_features(
        &self,
        point: Coordinates,
        _radius: u32,
        _tags: &TagFilter,
        _layer: &str,
    ) -> Option<FeatureCollection> {
        Some(FeatureCollection {
            polygons: vec![FeaturePolygon {
                exterior: vec![
                    Coordinates { lat: point.lat + 0.002, lon: point.lon + 0.002 },
                    Coordinates { lat: point.lat + 0.005, lon: point.lon + 0.002 },
                    Coordinates { lat: point.lat + 0.005, lon: point.lon + 0.005 },
                    Coordinates { lat: point.lat + 0.002, lon: point.lon + 0.002 },
                ],
            }],
        })
    }
}

/// Map data provider whose network fetches park on a gate until released,
/// so tests can observe how many renders are in flight at once.
pub struct GatedMapData {
    started: AtomicUsize,
    gate: Semaphore,
}

impl GatedMapData {
    pub fn new() -> Self {
        Self { started: AtomicUsize::new(0), gate: Semaphore::new(0) }
    }

    /// Number of network fetches that have entered the worker pool so far.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Let `n` parked fetches proceed.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl MapDataProvider for GatedMapData {
    async fn fetch_network(&self, point: Coordinates, _radius: u32) -> Option<StreetNetwork> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.gate.acquire().await.expect("gate closed").forget();
        Some(SyntheticMapData::grid(point))
    }

    async fn fetch_features(
        &self,
        _point: Coordinates,
        _radius: u32,
        _tags: &TagFilter,
        _layer: &str,
    ) -> Option<FeatureCollection> {
        None
    }
}

/// Provider where the street network is unavailable; feature layers too.
pub struct NoNetworkMapData;

#[async_trait]
impl MapDataProvider for NoNetworkMapData {
    async fn fetch_network(&self, _point: Coordinates, _radius: u32) -> Option<StreetNetwork> {
        None
    }

    async fn fetch_features(
        &self,
        _point: Coordinates,
        _radius: u32,
        _tags: &TagFilter,
        _layer: &str,
    ) -> Option<FeatureCollection> {
        None
    }
}

pub fn temp_posters_dir() -> PathBuf {
    std::env::temp_dir().join(format!("poster-pipeline-test-{}", uuid::Uuid::new_v4()))
}

/// Pipeline wired to test doubles, rendering a small canvas for speed.
pub fn test_pipeline(map_data: Arc<dyn MapDataProvider>, posters_dir: PathBuf) -> PosterPipeline {
    let themes = Arc::new(ThemeStore::new(format!("{}/themes", env!("CARGO_MANIFEST_DIR"))));
    PosterPipeline::new(
        Arc::new(FixedGeocoder(PARIS)),
        map_data,
        themes,
        CanvasSize { width_in: 3.0, height_in: 4.0, dpi: 50 },
        posters_dir,
        None,
    )
}
