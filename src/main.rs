use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use map_poster_api::{
    app_state::AppState,
    config::AppConfig,
    routes,
    services::{
        cache::GeometryCache,
        dispatcher::Dispatcher,
        geocoder::{Geocoder, GeocoderClient},
        jobs::JobStore,
        map_data::{MapDataProvider, OverpassClient},
        pipeline::PosterPipeline,
        renderer::CanvasSize,
        themes::ThemeStore,
        typography,
    },
};

/// How often stale job records are swept out of the store.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing map-poster-api server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("poster_jobs_total", "Total poster jobs submitted");
    metrics::describe_counter!("poster_jobs_completed", "Total poster jobs completed");
    metrics::describe_counter!("poster_jobs_failed", "Total poster jobs that failed");
    metrics::describe_gauge!("poster_queue_depth", "Current number of queued jobs");
    metrics::describe_histogram!("poster_render_seconds", "Time to generate one poster");

    // Shared geometry cache for geocoding and map data
    let cache = Arc::new(GeometryCache::new(&config.cache_dir));

    // Theme assets
    let themes = Arc::new(ThemeStore::new(&config.themes_dir));

    // Upstream adapters
    let geocoder: Arc<dyn Geocoder> =
        Arc::new(GeocoderClient::new(&config.nominatim_url, cache.clone()));
    let map_data: Arc<dyn MapDataProvider> =
        Arc::new(OverpassClient::new(&config.overpass_url, cache.clone()));

    // Poster fonts; the renderer degrades to no typography when missing
    let fonts = typography::load_fonts(Path::new(&config.fonts_dir));
    if fonts.is_none() {
        tracing::warn!(dir = %config.fonts_dir, "Roboto fonts not found, posters will omit typography");
    }

    let pipeline = Arc::new(PosterPipeline::new(
        geocoder,
        map_data,
        themes.clone(),
        CanvasSize::default(),
        &config.posters_dir,
        fonts,
    ));

    // Job store and dispatcher
    let (store, queue) = JobStore::new();
    let store = Arc::new(store);
    let dispatcher = Dispatcher::spawn(store.clone(), pipeline, queue);

    // Periodic sweep of stale job records
    let sweeper_store = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper_store.sweep_expired().await;
        }
    });

    let posters_dir = config.posters_dir.clone();
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, store, themes);

    // Build API routes
    let app = Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/themes", get(routes::themes::list_themes))
        .route("/api/generate", post(routes::generate::submit_job))
        .route("/api/jobs/{job_id}", get(routes::generate::job_status))
        .nest_service("/api/posters", ServeDir::new(posters_dir))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // JSON bodies only

    tracing::info!("Starting map-poster-api on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .expect("Server error");

    // Abandon the consumption loop; in-flight jobs are not rolled back.
    dispatcher.shutdown();
    tracing::info!("Dispatcher stopped");
}
